//! # Module Reference Resolution
//!
//! Build files refer to other modules' files with `:name` (the module's
//! source or default output set) and `:name{tag}` (one of its named output
//! groups). This module parses that syntax and resolves references against
//! the already-finalized dependency graph.
//!
//! Resolution is a single exact-match lookup of the `(name, tag)` edge key,
//! not a search, so it costs O(out-degree) per reference. The edge must
//! have been added by the pre-pass in `path_properties` during an earlier
//! phase; an absent edge yields a distinguished missing-dependency
//! condition rather than a hard error, so callers can choose to defer.

use crate::context::DepsPathContext;
use crate::error::Error;
use crate::paths::Paths;

/// Decodes a `:name` module reference into the module name, or `None` if
/// the string is a literal path.
pub fn src_is_module(s: &str) -> Option<&str> {
    if s.len() > 1 && s.starts_with(':') {
        Some(&s[1..])
    } else {
        None
    }
}

/// Decodes `:name{tag}` into `(name, tag)`, `:name` into `(name, "")`, or
/// `None` if the string is a literal path.
pub fn parse_src_reference(s: &str) -> Option<(&str, &str)> {
    let module = src_is_module(s)?;
    if let Some(tag_start) = module.find('{') {
        if tag_start > 0 && module.ends_with('}') {
            let tag = &module[tag_start + 1..module.len() - 1];
            return Some((&module[..tag_start], tag));
        }
    }
    Some((module, ""))
}

/// How a module reference failed to resolve.
#[derive(Debug)]
pub enum DepError {
    /// The dependency edge is absent or the module is disabled. Soft: the
    /// caller accumulates the names and decides fatal-vs-deferred later.
    Missing(Vec<String>),
    /// The reference resolved but cannot be satisfied. Fatal to the module.
    Hard(Error),
}

/// Resolves the paths a `:name`/`:name{tag}` reference stands for.
///
/// Classification of the resolved module, in order: a host tool referenced
/// without a tag resolves to its built binary; an output-file producer is
/// asked for the tagged group; a tagged reference to anything else is a
/// hard error; an untagged reference falls back to the module's source
/// files; anything else is a hard error naming the reference.
pub fn paths_from_module_dep(
    ctx: &dyn DepsPathContext,
    reference: &str,
    module_name: &str,
    tag: &str,
) -> Result<Paths, DepError> {
    let Some(module) = ctx.get_dep_with_tag(module_name, tag) else {
        return Err(DepError::Missing(vec![module_name.to_string()]));
    };
    if !module.enabled() {
        // Disabled modules resolve exactly like missing ones.
        return Err(DepError::Missing(vec![module_name.to_string()]));
    }

    if tag.is_empty() {
        if let Some(tool) = module.as_host_tool_provider() {
            let path = tool.host_tool_path();
            if path.valid() {
                return Ok(vec![path.path().clone()]);
            }
            return Err(DepError::Hard(Error::MissingToolOutput {
                reference: reference.to_string(),
            }));
        }
    }

    if let Some(producer) = module.as_output_file_producer() {
        match producer.output_files(tag) {
            Ok(paths) => Ok(paths),
            Err(err) => Err(DepError::Hard(Error::PathDependency {
                reference: reference.to_string(),
                message: err.to_string(),
            })),
        }
    } else if !tag.is_empty() {
        Err(DepError::Hard(Error::NotAnOutputProducer {
            reference: reference.to_string(),
        }))
    } else if let Some(producer) = module.as_source_file_producer() {
        Ok(producer.srcs())
    } else {
        Err(DepError::Hard(Error::NotASourceProducer {
            reference: reference.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MockFs;
    use crate::testing::{
        path_for_testing, test_config, HostToolModule, OutputFilesModule, PlainModule,
        SourceFilesModule, TestModuleContext,
    };

    #[test]
    fn test_src_is_module() {
        assert_eq!(src_is_module(":foo"), Some("foo"));
        assert_eq!(src_is_module("foo"), None);
        assert_eq!(src_is_module(":"), None);
        assert_eq!(src_is_module(""), None);
    }

    #[test]
    fn test_parse_src_reference() {
        assert_eq!(parse_src_reference(":foo"), Some(("foo", "")));
        assert_eq!(parse_src_reference(":foo{.bar}"), Some(("foo", ".bar")));
        assert_eq!(parse_src_reference("foo"), None);
        assert_eq!(parse_src_reference("foo{.bar}"), None);
        // An unterminated tag is treated as part of the module name.
        assert_eq!(parse_src_reference(":foo{.bar"), Some(("foo{.bar", "")));
        // A leading brace cannot start a tag.
        assert_eq!(parse_src_reference(":{tag}"), Some(("{tag}", "")));
    }

    fn ctx() -> TestModuleContext {
        TestModuleContext::new(test_config("out", MockFs::new()), "foo", "foo")
    }

    #[test]
    fn test_resolve_missing_dependency() {
        let ctx = ctx();
        let err = paths_from_module_dep(&ctx, ":absent", "absent", "").unwrap_err();
        match err {
            DepError::Missing(names) => assert_eq!(names, vec!["absent"]),
            other => panic!("expected missing dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_disabled_module_is_missing() {
        let mut ctx = ctx();
        ctx.add_dep(
            "gen",
            "",
            SourceFilesModule::new("gen", vec![path_for_testing(&["fg", "src", "a"])])
                .disabled(),
        );
        let err = paths_from_module_dep(&ctx, ":gen", "gen", "").unwrap_err();
        assert!(matches!(err, DepError::Missing(names) if names == vec!["gen"]));
    }

    #[test]
    fn test_resolve_source_file_producer() {
        let mut ctx = ctx();
        let src = path_for_testing(&["fg", "src", "a"]);
        ctx.add_dep("fg", "", SourceFilesModule::new("fg", vec![src.clone()]));
        let paths = paths_from_module_dep(&ctx, ":fg", "fg", "").unwrap();
        assert_eq!(paths, vec![src]);
    }

    #[test]
    fn test_resolve_output_file_producer_with_tag() {
        let mut ctx = ctx();
        let out = path_for_testing(&["out", "gen", "a.h"]);
        ctx.add_dep(
            "gen",
            ".h",
            OutputFilesModule::new("gen").with_tagged_output(".h", vec![out.clone()]),
        );
        let paths = paths_from_module_dep(&ctx, ":gen{.h}", "gen", ".h").unwrap();
        assert_eq!(paths, vec![out]);
    }

    #[test]
    fn test_resolve_unknown_tag_is_hard_error() {
        let mut ctx = ctx();
        ctx.add_dep("gen", ".bad", OutputFilesModule::new("gen"));
        let err = paths_from_module_dep(&ctx, ":gen{.bad}", "gen", ".bad").unwrap_err();
        match err {
            DepError::Hard(err) => {
                let display = format!("{}", err);
                assert!(display.contains(":gen{.bad}"));
                assert!(display.contains("unsupported module reference tag"));
            }
            other => panic!("expected hard error, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_tagged_non_producer_is_hard_error() {
        let mut ctx = ctx();
        let src = path_for_testing(&["fg", "src", "a"]);
        ctx.add_dep(".tag-holder", ".x", SourceFilesModule::new(".tag-holder", vec![src]));
        let err =
            paths_from_module_dep(&ctx, ":.tag-holder{.x}", ".tag-holder", ".x").unwrap_err();
        assert!(matches!(err, DepError::Hard(Error::NotAnOutputProducer { .. })));
    }

    #[test]
    fn test_resolve_non_producer_is_hard_error() {
        let mut ctx = ctx();
        ctx.add_dep("plain", "", PlainModule::new("plain"));
        let err = paths_from_module_dep(&ctx, ":plain", "plain", "").unwrap_err();
        assert!(matches!(err, DepError::Hard(Error::NotASourceProducer { .. })));
    }

    #[test]
    fn test_resolve_host_tool() {
        let mut ctx = ctx();
        let tool = path_for_testing(&["out", "host", "bin", "gen_tool"]);
        ctx.add_dep("gen_tool", "", HostToolModule::new("gen_tool", Some(tool.clone())));
        let paths = paths_from_module_dep(&ctx, ":gen_tool", "gen_tool", "").unwrap();
        assert_eq!(paths, vec![tool]);
    }

    #[test]
    fn test_resolve_host_tool_without_output_is_hard_error() {
        let mut ctx = ctx();
        ctx.add_dep("gen_tool", "", HostToolModule::new("gen_tool", None));
        let err = paths_from_module_dep(&ctx, ":gen_tool", "gen_tool", "").unwrap_err();
        assert!(matches!(err, DepError::Hard(Error::MissingToolOutput { .. })));
    }
}

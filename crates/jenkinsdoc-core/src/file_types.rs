//! Deciding which documents the engine should act on.

use std::path::Path;

use crate::config::DocConfig;

/// Marker looked for in file names (`Jenkinsfile`, `Jenkinsfile.prod`, `build.Jenkinsfile`)
const JENKINSFILE_MARKER: &str = "Jenkinsfile";

fn is_groovy(path: Option<&Path>, language_id: Option<&str>) -> bool {
    let by_language = language_id.is_some_and(|id| id.to_ascii_lowercase().contains("groovy"));
    let by_extension = path
        .and_then(|p| p.extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("groovy"));
    by_language || by_extension
}

fn matches_additional_pattern(path: &Path, patterns: &[String]) -> bool {
    let full = path.to_string_lossy();
    let base = path.file_name().map(|n| n.to_string_lossy());
    patterns.iter().any(|pattern| match glob::Pattern::new(pattern) {
        Ok(compiled) => {
            compiled.matches(&full) || base.as_deref().is_some_and(|b| compiled.matches(b))
        }
        Err(error) => {
            tracing::debug!(pattern, %error, "ignoring invalid file pattern");
            false
        }
    })
}

/// Whether a document is a Jenkins pipeline file under the given settings.
///
/// `path` is absent for unsaved buffers; `language_id` is the editor's
/// language identifier when known.
pub fn is_jenkins_file(path: Option<&Path>, language_id: Option<&str>, config: &DocConfig) -> bool {
    if !config.enabled {
        return false;
    }

    if config.detect_groovy_files && is_groovy(path, language_id) {
        return true;
    }

    let Some(path) = path else {
        return false;
    };

    if config.detect_jenkinsfile
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.contains(JENKINSFILE_MARKER))
    {
        return true;
    }

    matches_additional_pattern(path, &config.additional_file_patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(path: &str, language_id: Option<&str>, config: &DocConfig) -> bool {
        is_jenkins_file(Some(Path::new(path)), language_id, config)
    }

    #[test]
    fn test_jenkinsfile_variants() {
        let config = DocConfig::default();
        assert!(check("/repo/Jenkinsfile", None, &config));
        assert!(check("/repo/Jenkinsfile.release", None, &config));
        assert!(check("/repo/ci/deploy.Jenkinsfile", None, &config));
        assert!(!check("/repo/jenkinsfile", None, &config));
        assert!(!check("/repo/README.md", None, &config));
    }

    #[test]
    fn test_groovy_by_extension_or_language() {
        let config = DocConfig::default();
        assert!(check("/repo/vars/lib.groovy", None, &config));
        assert!(check("/repo/script.txt", Some("groovy"), &config));
        assert!(is_jenkins_file(None, Some("source.groovy"), &config));
        assert!(!is_jenkins_file(None, Some("python"), &config));
        assert!(!is_jenkins_file(None, None, &config));
    }

    #[test]
    fn test_detection_switches() {
        let config = DocConfig {
            detect_groovy_files: false,
            detect_jenkinsfile: false,
            ..DocConfig::default()
        };
        assert!(!check("/repo/Jenkinsfile", None, &config));
        assert!(!check("/repo/lib.groovy", Some("groovy"), &config));
    }

    #[test]
    fn test_disabled_matches_nothing() {
        let config = DocConfig {
            enabled: false,
            ..DocConfig::default()
        };
        assert!(!check("/repo/Jenkinsfile", Some("groovy"), &config));
    }

    #[test]
    fn test_additional_patterns_match_path_or_name() {
        let config = DocConfig {
            additional_file_patterns: vec![
                "*.jenkins".to_string(),
                "/ci/**/pipeline.txt".to_string(),
                "[".to_string(),
            ],
            ..DocConfig::default()
        };
        assert!(check("/repo/build.jenkins", None, &config));
        assert!(check("/ci/a/b/pipeline.txt", None, &config));
        assert!(!check("/repo/pipeline.txt", None, &config));
        assert!(!check("/repo/notes.md", None, &config));
    }
}

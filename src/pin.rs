//! Diff-aware writer for the three local pin files.
//!
//! `.yarnrc.yml` is edited textually, line by line, so unrelated settings
//! survive untouched. `.pinyarn.js` always mirrors the bundled shim.
//! `.pinyarn.json` is rewritten structurally. Each file is written at most
//! once per run, and only when its proposed content differs from what is on
//! disk, so a rerun with identical input touches nothing.

use crate::transport::Transport;
use crate::types::{PinMetadata, ResolvedDist};
use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

pub const YARNRC: &str = ".yarnrc.yml";
pub const PIN_SCRIPT: &str = ".pinyarn.js";
pub const PIN_METADATA: &str = ".pinyarn.json";
pub const PACKAGE_JSON: &str = "package.json";

const DEFAULT_YARNRC: &str = "yarnPath: path\n";
const PLUGIN_DIR: &str = ".yarn/plugins/@yarnpkg/plugin-";

/// Bundled file contents shipped inside the binary, injected into the writer
/// rather than read from ambient globals.
pub struct TemplateBundle {
    pub script: &'static str,
    pub metadata: &'static str,
}

impl TemplateBundle {
    pub fn bundled() -> Self {
        Self {
            script: include_str!("../templates/pinyarn.js"),
            metadata: include_str!("../templates/pinyarn.json"),
        }
    }
}

/// What a [`write_pins`] call did, for reporting and for the rerun-is-a-noop
/// guarantee.
#[derive(Debug, Default)]
pub struct WriteSummary {
    /// Plugins whose URL probe succeeded, in config line order.
    pub pinned_plugins: Vec<(String, String)>,
    /// Pin files whose content actually changed.
    pub written: Vec<&'static str>,
}

/// Metadata currently pinned on disk, or the bundled default (minus its
/// plugin map) when the file is absent or unparsable.
pub fn load_metadata(dir: &Path, templates: &TemplateBundle) -> PinMetadata {
    match fs::read_to_string(dir.join(PIN_METADATA)) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(meta) => return meta,
            Err(err) => {
                tracing::warn!("ignoring unparsable {}: {}", PIN_METADATA, err);
            }
        },
        Err(_) => {}
    }
    let mut meta: PinMetadata = serde_json::from_str(templates.metadata)
        .expect("bundled metadata template is valid JSON");
    meta.plugin_urls.clear();
    meta
}

pub async fn write_pins<T: Transport>(
    dir: &Path,
    remote: &T,
    templates: &TemplateBundle,
    baseline: &PinMetadata,
    dist: &ResolvedDist,
) -> Result<WriteSummary> {
    let yarnrc_path = dir.join(YARNRC);
    let yarnrc = fs::read_to_string(&yarnrc_path).unwrap_or_else(|_| DEFAULT_YARNRC.to_string());

    let mut next_yarnrc = yarnrc.clone();
    let mut next_meta = baseline.clone();
    next_meta.yarn_url = Some(dist.url.clone());

    let mut summary = WriteSummary::default();

    // Classic releases carry no plugins-version; nothing to probe.
    if let Some(plugins_version) = &dist.plugins_version {
        for name in discover_plugins(&yarnrc) {
            let url = plugin_url(&name, plugins_version);
            if remote.head_ok(&url).await? {
                next_yarnrc = rewrite_plugin_line(&next_yarnrc, &name, &url);
                next_meta.plugin_urls.insert(name.clone(), url.clone());
                summary.pinned_plugins.push((name, url));
            }
        }
    }

    let script_path = dir.join(PIN_SCRIPT);
    if !script_path.exists() {
        next_yarnrc = rewrite_yarn_path(&next_yarnrc);
    }

    if next_yarnrc != yarnrc {
        fs::write(&yarnrc_path, &next_yarnrc)
            .with_context(|| format!("could not write {}", yarnrc_path.display()))?;
        summary.written.push(YARNRC);
    }

    let current_script = fs::read_to_string(&script_path).unwrap_or_default();
    if templates.script != current_script {
        fs::write(&script_path, templates.script)
            .with_context(|| format!("could not write {}", script_path.display()))?;
        summary.written.push(PIN_SCRIPT);
    }

    let current = serde_json::to_value(baseline)?;
    let proposed = serde_json::to_value(&next_meta)?;
    if proposed != current {
        let metadata_path = dir.join(PIN_METADATA);
        fs::write(&metadata_path, serde_json::to_string_pretty(&proposed)?)
            .with_context(|| format!("could not write {}", metadata_path.display()))?;
        summary.written.push(PIN_METADATA);
    }

    Ok(summary)
}

fn plugin_url(name: &str, plugins_version: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/yarnpkg/berry/{}/packages/plugin-{}/bin/%40yarnpkg/plugin-{}.js",
        plugins_version, name, name
    )
}

/// First 8 hex characters of the lowercase SHA-256 of the URL.
fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)[..8].to_string()
}

fn plugin_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^.*\.yarn/plugins/@yarnpkg/plugin-(.*?)(?:-[0-9a-f]{8})?\.cjs$")
            .expect("plugin path pattern compiles")
    })
}

/// Plugin short-names referenced by the config, in line order. A trailing
/// 8-hex disambiguation suffix from a previous pinning run is not part of
/// the name.
fn discover_plugins(yarnrc: &str) -> Vec<String> {
    yarnrc
        .lines()
        .filter(|line| line.contains(PLUGIN_DIR))
        .filter_map(|line| plugin_line_regex().captures(line.trim_end()))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Rewrite the config lines carrying `name` so the filename ends with the
/// URL-derived 8-hex suffix, replacing any prior suffix.
fn rewrite_plugin_line(yarnrc: &str, name: &str, url: &str) -> String {
    let suffix = url_hash(url);
    let pattern = format!(
        r"(\.yarn/plugins/@yarnpkg/plugin-){}(?:-[0-9a-f]{{8}})?(\.cjs)",
        regex::escape(name)
    );
    let re = Regex::new(&pattern).expect("escaped plugin name pattern compiles");
    re.replace_all(yarnrc, |caps: &regex::Captures| {
        format!("{}{}-{}{}", &caps[1], name, suffix, &caps[2])
    })
    .into_owned()
}

/// Point `yarnPath:` at the pin script, whatever it held before.
fn rewrite_yarn_path(yarnrc: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(yarnPath:[ \t]*)([^\n]*)\n?").expect("yarnPath pattern compiles")
    });
    re.replace(yarnrc, |caps: &regex::Captures| {
        format!("{}{}\n", &caps[1], PIN_SCRIPT)
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::stub::StubTransport;
    use tempfile::TempDir;

    fn berry_dist() -> ResolvedDist {
        ResolvedDist {
            version: "3.1.0".to_string(),
            plugins_version: Some("abcdef1".to_string()),
            description: "3.1.0 abcdef1".to_string(),
            url: "https://raw.githubusercontent.com/yarnpkg/berry/%40yarnpkg/cli/3.1.0/packages/yarnpkg-cli/bin/yarn.js".to_string(),
        }
    }

    #[test]
    fn plugins_discovered_with_and_without_suffix() {
        let yarnrc = "yarnPath: .pinyarn.js\nplugins:\n  \
            - .yarn/plugins/@yarnpkg/plugin-typescript-deadbeef.cjs\n  \
            - .yarn/plugins/@yarnpkg/plugin-interactive-tools.cjs\n  \
            - .yarn/sdks/not-a-plugin.cjs\n";
        assert_eq!(discover_plugins(yarnrc), vec!["typescript", "interactive-tools"]);
    }

    #[test]
    fn suffix_rewrite_is_idempotent() {
        let url = plugin_url("typescript", "abcdef1");
        let line = "  - .yarn/plugins/@yarnpkg/plugin-typescript-deadbeef.cjs\n";
        let once = rewrite_plugin_line(line, "typescript", &url);
        let twice = rewrite_plugin_line(&once, "typescript", &url);
        assert_eq!(once, twice);
        assert!(once.contains(&format!("plugin-typescript-{}.cjs", url_hash(&url))));
        assert!(!once.contains("deadbeef"));
    }

    #[test]
    fn rewrite_only_touches_the_named_plugin() {
        let url = plugin_url("typescript", "abcdef1");
        let yarnrc = "plugins:\n  \
            - .yarn/plugins/@yarnpkg/plugin-typescript.cjs\n  \
            - .yarn/plugins/@yarnpkg/plugin-workspace-tools.cjs\n";
        let rewritten = rewrite_plugin_line(yarnrc, "typescript", &url);
        assert!(rewritten.contains("plugin-workspace-tools.cjs"));
        assert!(rewritten.contains(&format!("plugin-typescript-{}.cjs", url_hash(&url))));
    }

    #[test]
    fn url_hash_is_8_lowercase_hex_chars() {
        let hash = url_hash("https://example.com/yarn.js");
        assert_eq!(hash.len(), 8);
        assert!(hash.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn yarn_path_rewrite_replaces_previous_target() {
        let rewritten = rewrite_yarn_path("yarnPath: .yarn/releases/yarn-3.1.0.cjs\nnodeLinker: pnp\n");
        assert_eq!(rewritten, "yarnPath: .pinyarn.js\nnodeLinker: pnp\n");
    }

    #[test]
    fn unparsable_metadata_falls_back_to_bundled_template() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PIN_METADATA), "{not json").unwrap();
        let meta = load_metadata(dir.path(), &TemplateBundle::bundled());
        assert_eq!(meta.yarn_url, None);
        assert!(meta.plugin_urls.is_empty());
    }

    #[tokio::test]
    async fn probed_plugin_is_pinned_with_content_hash_suffix() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(YARNRC),
            "yarnPath: .pinyarn.js\nplugins:\n  - .yarn/plugins/@yarnpkg/plugin-typescript-deadbeef.cjs\n",
        )
        .unwrap();

        let url = plugin_url("typescript", "abcdef1");
        let remote = StubTransport::new().live(&url);
        let templates = TemplateBundle::bundled();
        let baseline = load_metadata(dir.path(), &templates);

        let summary = write_pins(dir.path(), &remote, &templates, &baseline, &berry_dist())
            .await
            .unwrap();
        assert_eq!(summary.pinned_plugins, vec![("typescript".to_string(), url.clone())]);

        let yarnrc = fs::read_to_string(dir.path().join(YARNRC)).unwrap();
        assert!(yarnrc.contains(&format!("plugin-typescript-{}.cjs", url_hash(&url))));
        let _: serde_yaml::Value = serde_yaml::from_str(&yarnrc).unwrap();

        let meta: PinMetadata =
            serde_json::from_str(&fs::read_to_string(dir.path().join(PIN_METADATA)).unwrap())
                .unwrap();
        assert_eq!(meta.plugin_urls.get("typescript"), Some(&url));
        assert_eq!(meta.yarn_url.as_deref(), Some(berry_dist().url.as_str()));
    }

    #[tokio::test]
    async fn unreachable_plugin_is_left_alone_and_map_omitted() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(YARNRC),
            "yarnPath: .pinyarn.js\nplugins:\n  - .yarn/plugins/@yarnpkg/plugin-typescript.cjs\n",
        )
        .unwrap();

        let remote = StubTransport::new();
        let templates = TemplateBundle::bundled();
        let baseline = load_metadata(dir.path(), &templates);

        let summary = write_pins(dir.path(), &remote, &templates, &baseline, &berry_dist())
            .await
            .unwrap();
        assert!(summary.pinned_plugins.is_empty());

        let yarnrc = fs::read_to_string(dir.path().join(YARNRC)).unwrap();
        assert!(yarnrc.contains("plugin-typescript.cjs"));

        let raw = fs::read_to_string(dir.path().join(PIN_METADATA)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("pluginUrls").is_none());
    }

    #[tokio::test]
    async fn second_run_with_identical_input_writes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(YARNRC),
            "yarnPath: .yarn/releases/yarn.cjs\nplugins:\n  - .yarn/plugins/@yarnpkg/plugin-typescript.cjs\n",
        )
        .unwrap();

        let url = plugin_url("typescript", "abcdef1");
        let remote = StubTransport::new().live(&url);
        let templates = TemplateBundle::bundled();
        let dist = berry_dist();

        let baseline = load_metadata(dir.path(), &templates);
        let first = write_pins(dir.path(), &remote, &templates, &baseline, &dist)
            .await
            .unwrap();
        assert_eq!(first.written, vec![YARNRC, PIN_SCRIPT, PIN_METADATA]);

        let baseline = load_metadata(dir.path(), &templates);
        let second = write_pins(dir.path(), &remote, &templates, &baseline, &dist)
            .await
            .unwrap();
        assert!(second.written.is_empty());
        // probing still happens; only the writes are skipped
        assert_eq!(second.pinned_plugins.len(), 1);
    }

    #[tokio::test]
    async fn missing_yarnrc_starts_from_the_placeholder() {
        let dir = TempDir::new().unwrap();
        let remote = StubTransport::new();
        let templates = TemplateBundle::bundled();
        let baseline = load_metadata(dir.path(), &templates);

        write_pins(dir.path(), &remote, &templates, &baseline, &berry_dist())
            .await
            .unwrap();

        // the placeholder's yarnPath now points at the freshly written shim
        let yarnrc = fs::read_to_string(dir.path().join(YARNRC)).unwrap();
        assert_eq!(yarnrc, format!("yarnPath: {}\n", PIN_SCRIPT));
        assert!(dir.path().join(PIN_SCRIPT).exists());
    }

    #[tokio::test]
    async fn existing_script_keeps_yarn_path_untouched() {
        let dir = TempDir::new().unwrap();
        let templates = TemplateBundle::bundled();
        fs::write(dir.path().join(PIN_SCRIPT), templates.script).unwrap();
        fs::write(dir.path().join(YARNRC), "yarnPath: custom/yarn.cjs\n").unwrap();

        let remote = StubTransport::new();
        let baseline = load_metadata(dir.path(), &templates);
        write_pins(dir.path(), &remote, &templates, &baseline, &berry_dist())
            .await
            .unwrap();

        let yarnrc = fs::read_to_string(dir.path().join(YARNRC)).unwrap();
        assert_eq!(yarnrc, "yarnPath: custom/yarn.cjs\n");
    }
}

//! Tag discovery over the git smart-HTTP reference advertisement.
//!
//! `GET <repo>.git/info/refs?service=git-upload-pack` answers with pkt-line
//! framing: every line carries a 4-hex-digit length prefix, and a length of
//! zero is a flow terminator rather than data.

use std::collections::BTreeMap;

pub const BERRY_GIT_URL: &str = "https://github.com/yarnpkg/berry.git";
pub const CLI_TAG_PREFIX: &str = "refs/tags/@yarnpkg/cli/";

/// Parse a pkt-line framed ref advertisement into cleaned ref name -> commit
/// hash.
///
/// Plain tag refs are dropped in favour of their peeled `^{}` entries, which
/// point at the tagged commit rather than the annotated tag object; the
/// peeled suffix is stripped from the kept name. Lines that do not frame a
/// `<sha> <ref>` payload (service banner, capability advertisements) fall
/// through harmlessly.
pub fn parse_ref_advertisement(body: &str) -> BTreeMap<String, String> {
    let mut refs = BTreeMap::new();
    for line in body.split('\n') {
        let Some(prefix) = line.get(..4) else { continue };
        let Ok(len) = usize::from_str_radix(prefix, 16) else { continue };
        if len == 0 {
            continue;
        }
        let end = line.len().min(4 + len);
        let Some(payload) = line.get(4..end) else { continue };
        let Some((sha, name)) = payload.split_once(' ') else { continue };
        if name.starts_with("refs/tags/") && !name.ends_with("^{}") {
            continue;
        }
        refs.insert(name.trim_end_matches("^{}").to_string(), sha.to_string());
    }
    refs
}

/// Latest CLI tag: the lexicographically last name under the CLI tag
/// namespace.
pub fn select_latest_cli(refs: &BTreeMap<String, String>) -> Option<(&str, &str)> {
    refs.iter()
        .rev()
        .find(|(name, _)| name.starts_with(CLI_TAG_PREFIX))
        .map(|(name, sha)| (name.as_str(), sha.as_str()))
}

/// CLI tag exactly matching the requested version.
pub fn select_exact_cli<'a>(
    refs: &'a BTreeMap<String, String>,
    version: &str,
) -> Option<(&'a str, &'a str)> {
    let wanted = format!("{}{}", CLI_TAG_PREFIX, version);
    refs.get_key_value(wanted.as_str())
        .map(|(name, sha)| (name.as_str(), sha.as_str()))
}

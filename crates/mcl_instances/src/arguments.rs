//! Renders the final JVM and game argument vectors: rule-gated
//! template expansion plus `${placeholder}` substitution.

use std::{collections::BTreeMap, path::Path};

use md5::{Digest, Md5};
use mcl_core::{
    json::version::{ArgumentEntry, ArgumentValue},
    rules::{self, HostFacts},
    CLASSPATH_SEPARATOR,
};

/// A substitution value: most placeholders are single strings, but a
/// list-valued one expands its (whole-token) placeholder into several
/// tokens.
#[derive(Debug, Clone)]
pub enum SubValue {
    Str(String),
    List(Vec<String>),
}

impl From<String> for SubValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for SubValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

pub type Substitutions = BTreeMap<String, SubValue>;

/// Default JVM arguments for descriptors that predate structured
/// `arguments`.
#[must_use]
pub fn legacy_jvm_args() -> Vec<String> {
    vec![
        "-Djava.library.path=${natives_directory}".to_owned(),
        "-cp".to_owned(),
        "${classpath}".to_owned(),
    ]
}

/// Walks one argument list, keeping literals and expanding
/// rule-gated entries whose rules allow. List values expand inline.
#[must_use]
pub fn expand_entries(
    entries: &[ArgumentEntry],
    facts: &HostFacts,
    features: &BTreeMap<String, bool>,
) -> Vec<String> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            ArgumentEntry::Plain(token) => out.push(token.clone()),
            ArgumentEntry::Conditional { rules, value } => {
                if !rules::eval(rules, facts, features) {
                    continue;
                }
                match value {
                    ArgumentValue::Single(token) => out.push(token.clone()),
                    ArgumentValue::List(tokens) => out.extend(tokens.iter().cloned()),
                }
            }
        }
    }
    out
}

/// Substitutes `${name}` placeholders into a token list.
///
/// A token that *is* a placeholder whose value is a list expands into
/// that many tokens; otherwise every embedded placeholder with a known
/// value is replaced inline. Unknown placeholders are left verbatim.
#[must_use]
pub fn substitute(tokens: Vec<String>, subs: &Substitutions) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Some(name) = whole_placeholder(&token) {
            if let Some(SubValue::List(values)) = subs.get(name) {
                out.extend(values.iter().cloned());
                continue;
            }
        }
        out.push(substitute_inline(token, subs));
    }
    out
}

fn whole_placeholder(token: &str) -> Option<&str> {
    let inner = token.strip_prefix("${")?.strip_suffix('}')?;
    (!inner.is_empty() && !inner.contains('{')).then_some(inner)
}

fn substitute_inline(token: String, subs: &Substitutions) -> String {
    if !token.contains("${") {
        return token;
    }
    let mut result = token;
    for (name, value) in subs {
        let placeholder = format!("${{{name}}}");
        if !result.contains(&placeholder) {
            continue;
        }
        let replacement = match value {
            SubValue::Str(s) => s.clone(),
            // A list value embedded mid-token flattens with spaces;
            // whole-token expansion is handled by the caller.
            SubValue::List(values) => values.join(" "),
        };
        result = result.replace(&placeholder, &replacement);
    }
    result
}

/// Joins library jars and the client jar into the `-cp` value.
#[must_use]
pub fn build_classpath(library_jars: &[std::path::PathBuf], client_jar: &Path) -> String {
    let mut entries: Vec<String> = library_jars
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    entries.push(client_jar.to_string_lossy().into_owned());
    entries.join(&CLASSPATH_SEPARATOR.to_string())
}

/// Derives the deterministic offline UUID of a username: the RFC 4122
/// v3 UUID of `md5("OfflinePlayer:" + name)`.
#[must_use]
pub fn offline_uuid(username: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("OfflinePlayer:{username}").as_bytes());
    let mut bytes: [u8; 16] = hasher.finalize().into();
    // Version 3, RFC 4122 variant.
    bytes[6] = bytes[6] & 0x0F | 0x30;
    bytes[8] = bytes[8] & 0x3F | 0x80;

    let hex = bytes.iter().fold(String::new(), |mut out, b| {
        use std::fmt::Write as _;
        let _ = write!(out, "{b:02x}");
        out
    });
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> HostFacts {
        HostFacts {
            os_name: "linux".to_owned(),
            os_version: None,
            arch: "x86_64".to_owned(),
        }
    }

    fn subs(pairs: &[(&str, SubValue)]) -> Substitutions {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn legacy_arguments_split_and_substitute() {
        let tokens: Vec<String> = "--username ${auth_player_name} --version ${version_name}"
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        let subs = subs(&[
            ("auth_player_name", SubValue::from("Steve")),
            ("version_name", SubValue::from("1.8.9")),
        ]);
        assert_eq!(
            substitute(tokens, &subs),
            ["--username", "Steve", "--version", "1.8.9"]
        );
    }

    #[test]
    fn unknown_placeholders_stay_verbatim() {
        let out = substitute(
            vec!["${quickPlayPath}".to_owned(), "--demo".to_owned()],
            &subs(&[]),
        );
        assert_eq!(out, ["${quickPlayPath}", "--demo"]);
    }

    #[test]
    fn embedded_placeholder_is_replaced_inline() {
        let out = substitute(
            vec!["-Djava.library.path=${natives_directory}".to_owned()],
            &subs(&[("natives_directory", SubValue::from("/game/natives"))]),
        );
        assert_eq!(out, ["-Djava.library.path=/game/natives"]);
    }

    #[test]
    fn list_substitution_expands_whole_token() {
        let out = substitute(
            vec!["${extra}".to_owned()],
            &subs(&[(
                "extra",
                SubValue::List(vec!["-Xms1G".to_owned(), "-Xmx2G".to_owned()]),
            )]),
        );
        assert_eq!(out, ["-Xms1G", "-Xmx2G"]);
    }

    #[test]
    fn conditional_entries_respect_features() {
        let entries: Vec<ArgumentEntry> = serde_json::from_str(
            r#"[
                "--username",
                "${auth_player_name}",
                {
                    "rules": [{"action": "allow", "features": {"has_custom_resolution": true}}],
                    "value": ["--width", "${resolution_width}", "--height", "${resolution_height}"]
                },
                {
                    "rules": [{"action": "allow", "features": {"is_demo_user": true}}],
                    "value": "--demo"
                }
            ]"#,
        )
        .unwrap();

        let none = expand_entries(&entries, &facts(), &BTreeMap::new());
        assert_eq!(none, ["--username", "${auth_player_name}"]);

        let mut features = BTreeMap::new();
        features.insert("has_custom_resolution".to_owned(), true);
        let with_resolution = expand_entries(&entries, &facts(), &features);
        assert_eq!(
            with_resolution,
            [
                "--username",
                "${auth_player_name}",
                "--width",
                "${resolution_width}",
                "--height",
                "${resolution_height}",
            ]
        );
    }

    #[test]
    fn classpath_joins_with_host_separator() {
        let jars = [std::path::PathBuf::from("/game/libraries/a.jar")];
        let classpath = build_classpath(&jars, Path::new("/game/versions/1.21/1.21.jar"));
        let expected =
            format!("/game/libraries/a.jar{CLASSPATH_SEPARATOR}/game/versions/1.21/1.21.jar");
        assert_eq!(classpath, expected);
    }

    #[test]
    fn offline_uuid_known_vectors() {
        assert_eq!(offline_uuid("Steve"), "5627dd98-e6be-3c21-b8a8-e92344183641");
        assert_eq!(offline_uuid("Alex"), "36532b5e-c442-3dbb-a24c-c7e55d0f979a");
        assert_eq!(offline_uuid("Notch"), "b50ad385-829d-3141-a216-7e7d7539ba7f");
    }

    #[test]
    fn offline_uuid_nibbles_are_rfc4122_v3() {
        for name in ["Steve", "a", "somebody_else", "X"] {
            let uuid = offline_uuid(name);
            // 14th hex digit is the version, 17th starts the variant.
            assert_eq!(uuid.as_bytes()[14], b'3', "version nibble for {name}");
            let variant = uuid
                .chars()
                .nth(19)
                .and_then(|c| c.to_digit(16))
                .unwrap_or(0);
            assert!(
                (0x8..=0xb).contains(&variant),
                "variant nibble for {name}: {variant:x}"
            );
            // Deterministic.
            assert_eq!(uuid, offline_uuid(name));
        }
    }
}

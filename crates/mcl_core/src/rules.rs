//! Evaluates the OS/arch/feature rule lists that gate libraries and
//! arguments in version descriptors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ARCH_NAME, OS_NAME};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Rule {
    pub action: RuleAction,
    pub os: Option<OsRule>,
    pub features: Option<BTreeMap<String, bool>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OsRule {
    pub name: Option<String>,
    /// Regex matched against the host OS version string.
    pub version: Option<String>,
    pub arch: Option<String>,
}

/// What the host looks like to the rule evaluator.
#[derive(Debug, Clone)]
pub struct HostFacts {
    /// `linux` / `windows` / `osx`
    pub os_name: String,
    /// Kernel / OS release string, when known.
    pub os_version: Option<String>,
    /// `x86` / `x86_64` / `arm64`
    pub arch: String,
}

impl HostFacts {
    #[must_use]
    pub fn current() -> Self {
        Self {
            os_name: OS_NAME.to_owned(),
            os_version: None,
            arch: ARCH_NAME.to_owned(),
        }
    }
}

/// Evaluates a rule list against the host.
///
/// An empty list is an implicit allow. Otherwise the outcome starts as
/// deny and every *matching* rule overwrites it with its action, top to
/// bottom. A rule matches when all of its conditions hold; feature keys
/// missing from `features` read as `false`, and an unknown host OS or
/// arch never matches.
#[must_use]
pub fn eval(rules: &[Rule], facts: &HostFacts, features: &BTreeMap<String, bool>) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        if rule_matches(rule, facts, features) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

fn rule_matches(rule: &Rule, facts: &HostFacts, features: &BTreeMap<String, bool>) -> bool {
    if let Some(os) = &rule.os {
        if let Some(name) = &os.name {
            if *name != facts.os_name {
                return false;
            }
        }
        if let Some(arch) = &os.arch {
            if *arch != facts.arch {
                return false;
            }
        }
        if let Some(version) = &os.version {
            let Some(host_version) = &facts.os_version else {
                return false;
            };
            // An unparseable pattern never matches.
            let matched = regex::Regex::new(version)
                .map(|re| re.is_match(host_version))
                .unwrap_or(false);
            if !matched {
                return false;
            }
        }
    }

    if let Some(required) = &rule.features {
        for (key, expected) in required {
            let actual = features.get(key).copied().unwrap_or(false);
            if actual != *expected {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux_facts() -> HostFacts {
        HostFacts {
            os_name: "linux".to_owned(),
            os_version: Some("6.1.0".to_owned()),
            arch: "x86_64".to_owned(),
        }
    }

    fn no_features() -> BTreeMap<String, bool> {
        BTreeMap::new()
    }

    fn allow(os: Option<OsRule>) -> Rule {
        Rule {
            action: RuleAction::Allow,
            os,
            features: None,
        }
    }

    fn disallow(os: Option<OsRule>) -> Rule {
        Rule {
            action: RuleAction::Disallow,
            os,
            features: None,
        }
    }

    fn os_named(name: &str) -> Option<OsRule> {
        Some(OsRule {
            name: Some(name.to_owned()),
            version: None,
            arch: None,
        })
    }

    #[test]
    fn empty_rules_allow() {
        assert!(eval(&[], &linux_facts(), &no_features()));
    }

    #[test]
    fn unconditional_allow() {
        assert!(eval(&[allow(None)], &linux_facts(), &no_features()));
    }

    #[test]
    fn allow_everywhere_except_osx() {
        // The shape used by lwjgl on most versions.
        let rules = [allow(None), disallow(os_named("osx"))];
        assert!(eval(&rules, &linux_facts(), &no_features()));

        let osx = HostFacts {
            os_name: "osx".to_owned(),
            ..linux_facts()
        };
        assert!(!eval(&rules, &osx, &no_features()));
    }

    #[test]
    fn os_specific_allow_denies_others() {
        let rules = [allow(os_named("windows"))];
        assert!(!eval(&rules, &linux_facts(), &no_features()));
    }

    #[test]
    fn arch_condition_must_match() {
        let rules = [allow(Some(OsRule {
            name: None,
            version: None,
            arch: Some("x86".to_owned()),
        }))];
        assert!(!eval(&rules, &linux_facts(), &no_features()));
    }

    #[test]
    fn version_regex_matches_host() {
        let rules = [allow(Some(OsRule {
            name: Some("linux".to_owned()),
            version: Some("^6\\.".to_owned()),
            arch: None,
        }))];
        assert!(eval(&rules, &linux_facts(), &no_features()));

        let unknown_version = HostFacts {
            os_version: None,
            ..linux_facts()
        };
        assert!(!eval(&rules, &unknown_version, &no_features()));
    }

    #[test]
    fn unknown_features_read_as_false() {
        let mut required = BTreeMap::new();
        required.insert("is_demo_user".to_owned(), true);
        let rules = [Rule {
            action: RuleAction::Allow,
            os: None,
            features: Some(required.clone()),
        }];
        assert!(!eval(&rules, &linux_facts(), &no_features()));

        let mut features = BTreeMap::new();
        features.insert("is_demo_user".to_owned(), true);
        assert!(eval(&rules, &linux_facts(), &features));

        // Requiring a feature to be off succeeds when the key is absent.
        required.insert("is_demo_user".to_owned(), false);
        let rules = [Rule {
            action: RuleAction::Allow,
            os: None,
            features: Some(required),
        }];
        assert!(eval(&rules, &linux_facts(), &no_features()));
    }

    #[test]
    fn evaluation_is_pure() {
        let rules = [allow(None), disallow(os_named("osx"))];
        let facts = linux_facts();
        let features = no_features();
        let first = eval(&rules, &facts, &features);
        for _ in 0..8 {
            assert_eq!(eval(&rules, &facts, &features), first);
        }
    }
}

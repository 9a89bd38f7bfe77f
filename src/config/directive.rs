//! Option directives from the `[options]` section of a settings file.
//!
//! ```text
//! enable  NAMESPACES USER_NS
//! disable MODULE_SIG
//! module  EXT4_FS
//! set     LOCALVERSION="-custom" HZ=300
//! ```

use std::fmt;
use std::str::FromStr;

use crate::config::document::{is_symbol, ConfigLine, CONFIG_PREFIX};
use crate::error::{Error, Result};

/// What a directive does to each of its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Enable,
    Disable,
    Module,
    Set,
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "enable" => Ok(Action::Enable),
            "disable" => Ok(Action::Disable),
            "module" => Ok(Action::Module),
            "set" => Ok(Action::Set),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Enable => "enable",
            Action::Disable => "disable",
            Action::Module => "module",
            Action::Set => "set",
        })
    }
}

/// One option touched by a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    /// Upper-cased symbol without the `CONFIG_` prefix.
    pub key: String,
    /// Raw value, only present for [`Action::Set`].
    pub value: Option<String>,
}

/// A parsed settings line: an action and the options it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDirective {
    action: Action,
    operands: Vec<Operand>,
}

impl OptionDirective {
    pub fn new(action: Action, operands: Vec<Operand>) -> Self {
        Self { action, operands }
    }

    /// Parse one `[options]` line such as `enable FOO BAR` or `set HZ=300`.
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let verb = tokens.next().unwrap_or_default();
        let action: Action = verb.parse().map_err(|_| Error::UnknownDirective {
            action: verb.to_string(),
            line: line.trim().to_string(),
        })?;

        let operands = tokens
            .map(|token| parse_operand(action, token))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { action, operands })
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// The canonical `.config` line this directive writes for `operand`.
    pub fn line_for(&self, operand: &Operand) -> ConfigLine {
        let key = operand.key.clone();
        match self.action {
            Action::Enable => ConfigLine::Set {
                key,
                value: "y".into(),
            },
            Action::Disable => ConfigLine::Unset { key },
            Action::Module => ConfigLine::Set {
                key,
                value: "m".into(),
            },
            Action::Set => ConfigLine::Set {
                key,
                value: operand.value.clone().unwrap_or_default(),
            },
        }
    }
}

impl fmt::Display for OptionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.action)?;
        for op in &self.operands {
            match &op.value {
                Some(value) => write!(f, " {}={}", op.key, value)?,
                None => write!(f, " {}", op.key)?,
            }
        }
        Ok(())
    }
}

fn parse_operand(action: Action, token: &str) -> Result<Operand> {
    let (raw_key, value) = match action {
        Action::Set => {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| Error::MalformedSetOperand {
                    operand: token.to_string(),
                })?;
            if key.is_empty() {
                return Err(Error::MalformedSetOperand {
                    operand: token.to_string(),
                });
            }
            (key, Some(value.to_string()))
        }
        Action::Enable | Action::Disable | Action::Module => (token, None),
    };

    let key = normalize_key(raw_key);
    if !is_symbol(&key) {
        return Err(Error::InvalidOptionName {
            name: raw_key.to_string(),
        });
    }
    Ok(Operand { key, value })
}

/// Upper-case a symbol and drop a `CONFIG_` prefix if the user wrote one.
fn normalize_key(raw: &str) -> String {
    let upper = raw.to_ascii_uppercase();
    match upper.strip_prefix(CONFIG_PREFIX) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => upper,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_enable_multiple_operands() {
        let d = OptionDirective::parse("enable namespaces User_NS").unwrap();
        assert_eq!(d.action(), Action::Enable);
        let keys: Vec<_> = d.operands().iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["NAMESPACES", "USER_NS"]);
        assert!(d.operands().iter().all(|o| o.value.is_none()));
    }

    #[test]
    fn test_parse_set_keeps_value_verbatim() {
        let d = OptionDirective::parse("set localversion=\"-Custom\" cmdline=root=/dev/sda1").unwrap();
        assert_eq!(
            d.operands(),
            &[
                Operand {
                    key: "LOCALVERSION".into(),
                    value: Some("\"-Custom\"".into())
                },
                Operand {
                    key: "CMDLINE".into(),
                    value: Some("root=/dev/sda1".into())
                },
            ]
        );
    }

    #[test]
    fn test_parse_tolerates_repeated_whitespace() {
        let d = OptionDirective::parse("  module\tEXT4_FS   BTRFS_FS ").unwrap();
        assert_eq!(d.action(), Action::Module);
        assert_eq!(d.operands().len(), 2);
    }

    #[test]
    fn test_parse_strips_config_prefix() {
        let d = OptionDirective::parse("disable CONFIG_MODULE_SIG").unwrap();
        assert_eq!(d.operands()[0].key, "MODULE_SIG");
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let err = OptionDirective::parse("toggle FOO").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDirective);
        assert!(err.to_string().contains("'toggle'"));
    }

    #[test]
    fn test_set_without_equals_is_rejected() {
        let err = OptionDirective::parse("set HZ=300 FOO").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedSetOperand);

        let err = OptionDirective::parse("set =1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedSetOperand);
    }

    #[test]
    fn test_operand_must_be_a_symbol() {
        for line in ["enable foo=bar", "disable foo-bar", "module ext4.fs", "set foo.bar=1"] {
            let err = OptionDirective::parse(line).unwrap_err();
            assert!(matches!(err, Error::InvalidOptionName { .. }), "{line}");
            assert_eq!(err.kind(), ErrorKind::MalformedInput);
        }

        // only the key of a set operand has to be a symbol
        let d = OptionDirective::parse("set foo=bar=1").unwrap();
        assert_eq!(d.operands()[0].key, "FOO");
    }

    #[test]
    fn test_action_without_operands() {
        let d = OptionDirective::parse("enable").unwrap();
        assert!(d.operands().is_empty());
    }

    #[test]
    fn test_line_for_each_action() {
        let op = Operand {
            key: "FOO".into(),
            value: Some("64".into()),
        };
        let render = |action| OptionDirective::new(action, vec![]).line_for(&op).to_string();
        assert_eq!(render(Action::Enable), "CONFIG_FOO=y");
        assert_eq!(render(Action::Disable), "# CONFIG_FOO is not set");
        assert_eq!(render(Action::Module), "CONFIG_FOO=m");
        assert_eq!(render(Action::Set), "CONFIG_FOO=64");
    }

    #[test]
    fn test_display() {
        let d = OptionDirective::parse("set hz=300 hz_300=y").unwrap();
        assert_eq!(d.to_string(), "set HZ=300 HZ_300=y");
    }
}

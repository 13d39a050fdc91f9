//! Signal match rules in the `key='value',...` textual form.

use crate::error::BusError;
use crate::message::{Message, names};
use std::fmt;
use std::str::FromStr;

/// Handle of a registered match; dropping a registration is explicit via `Bus::remove_match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match#{}", self.0)
    }
}

/// A conjunction of signal header and `arg0` constraints.
///
/// An unset field matches anything. `path_namespace` matches the path itself
/// and everything below it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MatchRule {
    pub sender: Option<String>,
    pub interface: Option<String>,
    pub member: Option<String>,
    pub path: Option<String>,
    pub path_namespace: Option<String>,
    pub arg0: Option<String>,
}

impl MatchRule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `PropertiesChanged` on `path` for `interface`.
    #[must_use]
    pub fn properties_changed(path: &str, interface: &str) -> Self {
        Self::new()
            .with_interface(names::PROPERTIES)
            .with_member(names::PROPERTIES_CHANGED)
            .with_path(path)
            .with_arg0(interface)
    }

    #[must_use = "Returns the updated rule"]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    #[must_use = "Returns the updated rule"]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    #[must_use = "Returns the updated rule"]
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    #[must_use = "Returns the updated rule"]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use = "Returns the updated rule"]
    pub fn with_path_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.path_namespace = Some(namespace.into());
        self
    }

    #[must_use = "Returns the updated rule"]
    pub fn with_arg0(mut self, arg0: impl Into<String>) -> Self {
        self.arg0 = Some(arg0.into());
        self
    }

    /// Returns `true` if every constraint holds for `msg`.
    #[must_use]
    pub fn matches(&self, msg: &Message) -> bool {
        fn eq(expected: Option<&String>, actual: &str) -> bool {
            expected.is_none_or(|e| e == actual)
        }

        eq(self.sender.as_ref(), &msg.sender)
            && eq(self.interface.as_ref(), &msg.interface)
            && eq(self.member.as_ref(), &msg.member)
            && eq(self.path.as_ref(), &msg.path)
            && self.path_namespace.as_deref().is_none_or(|ns| in_namespace(ns, &msg.path))
            && self.arg0.as_deref().is_none_or(|a| msg.arg0() == Some(a))
    }
}

fn in_namespace(namespace: &str, path: &str) -> bool {
    let namespace = namespace.trim_end_matches('/');
    namespace.is_empty()
        || path.strip_prefix(namespace).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn invalid(message: impl Into<std::borrow::Cow<'static, str>>, rule: &str) -> BusError {
    BusError::InvalidMatch { message: message.into(), context: Some(rule.to_owned().into()) }
}

/// Splits `key='value',key='value'` honouring quotes, so values may contain commas.
fn split_pairs(rule: &str) -> Result<Vec<(String, String)>, BusError> {
    let mut pairs = Vec::new();
    let mut chars = rule.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        let key = key.trim().to_owned();
        if key.is_empty() {
            return Err(invalid("empty key", rule));
        }

        if chars.next() != Some('\'') {
            return Err(invalid(format!("value of `{key}` must be quoted"), rule));
        }
        let mut value = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '\'' {
                closed = true;
                break;
            }
            value.push(c);
        }
        if !closed {
            return Err(invalid(format!("unterminated value for `{key}`"), rule));
        }

        match chars.peek() {
            None | Some(',') => {},
            Some(c) if c.is_whitespace() => {},
            Some(_) => return Err(invalid(format!("junk after value of `{key}`"), rule)),
        }
        pairs.push((key, value));
    }

    Ok(pairs)
}

impl FromStr for MatchRule {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rule = Self::new();
        for (key, value) in split_pairs(s)? {
            let slot = match key.as_str() {
                "type" => {
                    if value != "signal" {
                        return Err(invalid(format!("unsupported type `{value}`"), s));
                    }
                    continue;
                },
                "sender" => &mut rule.sender,
                "interface" => &mut rule.interface,
                "member" => &mut rule.member,
                "path" => &mut rule.path,
                "path_namespace" => &mut rule.path_namespace,
                "arg0" => &mut rule.arg0,
                other => return Err(invalid(format!("unknown key `{other}`"), s)),
            };
            if slot.replace(value).is_some() {
                return Err(invalid(format!("duplicate key `{key}`"), s));
            }
        }
        Ok(rule)
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("type='signal'")?;
        let fields = [
            ("sender", &self.sender),
            ("interface", &self.interface),
            ("member", &self.member),
            ("path", &self.path),
            ("path_namespace", &self.path_namespace),
            ("arg0", &self.arg0),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                write!(f, ",{key}='{value}'")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pim_domain::object::PropertyMap;

    fn changed_on(path: &str, iface: &str) -> Message {
        Message::properties_changed(":1.2", path, iface, PropertyMap::new())
    }

    #[test]
    fn parses_full_rule() {
        let rule: MatchRule = "type='signal',interface='org.freedesktop.DBus.Properties',\
                               member='PropertiesChanged',path='/a/b',arg0='x.y.Z'"
            .parse()
            .unwrap();
        assert_eq!(rule, MatchRule::properties_changed("/a/b", "x.y.Z"));
    }

    #[test]
    fn quoted_values_may_contain_commas() {
        let rule: MatchRule = "arg0='a,b'".parse().unwrap();
        assert_eq!(rule.arg0.as_deref(), Some("a,b"));
    }

    #[test]
    fn rejects_malformed_rules() {
        for bad in [
            "type='method_call'",
            "bogus='x'",
            "path=/a",
            "path='/a",
            "path='/a'x",
            "path='/a',path='/b'",
            "='x'",
        ] {
            let err = bad.parse::<MatchRule>().unwrap_err();
            assert_eq!(err.kind(), "InvalidMatch", "{bad}");
        }
    }

    #[test]
    fn display_round_trips() {
        let rule = MatchRule::new().with_sender(":1.9").with_path_namespace("/inv");
        let text = rule.to_string();
        assert_eq!(text, "type='signal',sender=':1.9',path_namespace='/inv'");
        assert_eq!(text.parse::<MatchRule>().unwrap(), rule);
    }

    #[test]
    fn matching_honours_every_constraint() {
        let rule = MatchRule::properties_changed("/a/b", "x.y.Z");
        assert!(rule.matches(&changed_on("/a/b", "x.y.Z")));
        assert!(!rule.matches(&changed_on("/a/b", "x.y.W")));
        assert!(!rule.matches(&changed_on("/a/bc", "x.y.Z")));
    }

    #[test]
    fn namespace_covers_descendants_only() {
        let rule = MatchRule::new().with_path_namespace("/inv");
        assert!(rule.matches(&changed_on("/inv", "i")));
        assert!(rule.matches(&changed_on("/inv/a/b", "i")));
        assert!(!rule.matches(&changed_on("/inventory", "i")));
    }

    #[test]
    fn empty_rule_matches_everything() {
        assert!(MatchRule::new().matches(&changed_on("/anything", "i")));
        assert_eq!("".parse::<MatchRule>().unwrap(), MatchRule::new());
    }
}

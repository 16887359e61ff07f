use serde::Serialize;
use thiserror::Error;

use crate::lexer::{logical_lines, tokenize, LogicalLine, Token};
use crate::statement::{OptValue, OptionMap, Statement, StatementKind, Verb};

/// Object types recognized after a verb, longest first within each prefix.
const OBJECT_TYPES: &[&str] = &[
    "lb vserver",
    "lb monitor",
    "lb group",
    "lb route",
    "lb parameter",
    "cs vserver",
    "cs policy",
    "cs action",
    "cs policylabel",
    "cs parameter",
    "gslb vserver",
    "gslb service",
    "gslb site",
    "ssl certKey",
    "ssl vserver",
    "ssl profile",
    "ssl service",
    "ssl serviceGroup",
    "ssl cipher",
    "ssl parameter",
    "responder policy",
    "responder action",
    "rewrite policy",
    "rewrite action",
    "policy patset",
    "policy stringmap",
    "policy expression",
    "audit syslogAction",
    "audit syslogPolicy",
    "authentication vserver",
    "vpn vserver",
    "cr vserver",
    "cache policy",
    "cmp policy",
    "dns nameServer",
    "net vlan",
    "ns ip",
    "ns ip6",
    "ns config",
    "ns hostName",
    "ns feature",
    "ns mode",
    "ns tcpProfile",
    "ns httpProfile",
    "ns partition",
    "ns param",
    "system user",
    "route",
    "server",
    "service",
    "serviceGroup",
];

/// Flags that open a nested option map inside `bind` statements.
const SUB_BINDING_FLAGS: &[&str] = &["-monitorName", "-policyName", "-certkeyName"];

/// A statement that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{source_name}:{line}: {reason}")]
pub struct ParseError {
    pub source_name: String,
    pub line: usize,
    pub reason: String,
    /// The offending statement text.
    pub text: String,
}

/// Result of parsing one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedConfig {
    pub statements: Vec<Statement>,
    pub errors: Vec<ParseError>,
}

/// Parse a whole configuration text.
///
/// Malformed statements become entries in `errors` and are skipped; every
/// other line, recognized or not, appears in `statements` in source order.
pub fn parse_config(text: &str, source_name: &str) -> ParsedConfig {
    let mut parsed = ParsedConfig::default();
    for line in logical_lines(text) {
        match parse_statement(&line, source_name) {
            Ok(statement) => parsed.statements.push(statement),
            Err(err) => parsed.errors.push(err),
        }
    }
    parsed
}

/// Parse one logical line into a [`Statement`].
pub fn parse_statement(line: &LogicalLine, source_name: &str) -> Result<Statement, ParseError> {
    let fail = |reason: String| ParseError {
        source_name: source_name.to_string(),
        line: line.number,
        reason,
        text: line.text.clone(),
    };

    let tokens = tokenize(&line.text).map_err(|err| fail(err.to_string()))?;

    let classified = tokens
        .first()
        .and_then(|t| Verb::parse(&t.text))
        .and_then(|verb| match_object_type(&tokens[1..]).map(|(ty, width)| (verb, ty, width)));

    let Some((verb, object_type, width)) = classified else {
        return Ok(pass_through(tokens, line, source_name));
    };

    let rest = &tokens[1 + width..];
    let (name, rest) = match rest.split_first() {
        Some((first, tail)) if !first.is_flag() => (Some(first.text.clone()), tail),
        _ => (None, rest),
    };

    if name.is_none() && matches!(verb, Verb::Add | Verb::Bind | Verb::Link) {
        return Err(fail(format!(
            "{} {object_type} requires an object name",
            verb.as_str()
        )));
    }

    let split = rest.iter().position(Token::is_flag).unwrap_or(rest.len());
    let positional = rest[..split].iter().map(|t| t.text.clone()).collect();
    let opts = parse_flags(&rest[split..], verb == Verb::Bind).map_err(fail)?;

    Ok(Statement {
        kind: StatementKind::Command {
            verb,
            object_type: object_type.to_string(),
        },
        name,
        positional,
        opts,
        source: source_name.to_string(),
        line: line.number,
        raw: line.text.clone(),
    })
}

fn match_object_type(tokens: &[Token]) -> Option<(&'static str, usize)> {
    let mut best: Option<(&'static str, usize)> = None;
    for candidate in OBJECT_TYPES {
        let words: Vec<&str> = candidate.split(' ').collect();
        if words.len() > tokens.len() {
            continue;
        }
        let matched = words
            .iter()
            .zip(tokens)
            .all(|(w, t)| !t.quoted && t.text.eq_ignore_ascii_case(w));
        if matched && best.map_or(true, |(_, width)| words.len() > width) {
            best = Some((candidate, words.len()));
        }
    }
    best
}

fn pass_through(tokens: Vec<Token>, line: &LogicalLine, source_name: &str) -> Statement {
    Statement {
        kind: StatementKind::PassThrough,
        name: None,
        positional: tokens.into_iter().map(|t| t.text).collect(),
        opts: OptionMap::new(),
        source: source_name.to_string(),
        line: line.number,
        raw: line.text.clone(),
    }
}

/// Parse `-flag value...` groups. With `nested`, sub-binding flags collect
/// the flags that follow them into their own map.
fn parse_flags(tokens: &[Token], nested: bool) -> Result<OptionMap, String> {
    let mut opts = OptionMap::new();
    let mut sub: Option<(String, OptionMap)> = None;
    let mut i = 0;

    while i < tokens.len() {
        let flag = &tokens[i].text;
        let mut values = Vec::new();
        i += 1;
        while i < tokens.len() && !tokens[i].is_flag() {
            values.push(tokens[i].text.clone());
            i += 1;
        }

        let opens_sub = nested
            && SUB_BINDING_FLAGS
                .iter()
                .any(|f| f.eq_ignore_ascii_case(flag));

        if opens_sub {
            if let Some((key, map)) = sub.take() {
                close_sub(&mut opts, key, map)?;
            }
            let mut map = OptionMap::new();
            map.append("name", values);
            sub = Some((flag.clone(), map));
        } else if let Some((_, map)) = sub.as_mut() {
            map.append(flag.clone(), values);
        } else {
            opts.append(flag.clone(), values);
        }
    }

    if let Some((key, map)) = sub.take() {
        close_sub(&mut opts, key, map)?;
    }
    Ok(opts)
}

fn close_sub(opts: &mut OptionMap, key: String, map: OptionMap) -> Result<(), String> {
    if opts.contains_key(&key) {
        return Err(format!("repeated sub-binding {key}"));
    }
    opts.insert(key, OptValue::Nested(map));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_config, parse_statement};
    use crate::lexer::LogicalLine;
    use crate::statement::{OptValue, StatementKind, Verb};

    fn line(text: &str) -> LogicalLine {
        LogicalLine {
            number: 7,
            text: text.to_string(),
        }
    }

    #[test]
    fn classifies_add_lb_vserver() {
        let stmt = parse_statement(
            &line("add lb vserver web_app HTTP 10.1.1.100 80 -persistenceType SOURCEIP -cltTimeout 180"),
            "ns.conf",
        )
        .expect("parse");

        assert!(stmt.is(Verb::Add, "lb vserver"));
        assert_eq!(stmt.name(), Some("web_app"));
        assert_eq!(stmt.positional, vec!["HTTP", "10.1.1.100", "80"]);
        assert_eq!(stmt.opts.get_str("-persistenceType"), Some("SOURCEIP"));
        assert_eq!(stmt.line, 7);
    }

    #[test]
    fn canonical_object_type_spelling_is_used() {
        let stmt = parse_statement(&line("add SSL CERTKEY ck1 -cert a.crt"), "ns.conf")
            .expect("parse");
        assert_eq!(stmt.object_type(), Some("ssl certKey"));
    }

    #[test]
    fn multi_value_flag_becomes_list() {
        let stmt = parse_statement(
            &line("add lb monitor m1 HTTP-ECV -respCode 200 302 -send \"GET /\""),
            "ns.conf",
        )
        .expect("parse");
        assert_eq!(
            stmt.opts.get("-respCode"),
            Some(&OptValue::List(vec!["200".to_string(), "302".to_string()]))
        );
        assert_eq!(stmt.opts.get_str("-send"), Some("\"GET /\""));
    }

    #[test]
    fn bind_monitor_opens_nested_map() {
        let stmt = parse_statement(
            &line("bind serviceGroup sg1 -monitorName mon1 -weight 2 -state DISABLED"),
            "ns.conf",
        )
        .expect("parse");
        let nested = stmt
            .opts
            .get("-monitorName")
            .and_then(OptValue::as_map)
            .expect("nested map");
        assert_eq!(nested.get_str("name"), Some("mon1"));
        assert_eq!(nested.get_str("-weight"), Some("2"));
        assert!(!stmt.opts.contains_key("-weight"));
    }

    #[test]
    fn flags_before_sub_binding_stay_top_level() {
        let stmt = parse_statement(
            &line("bind cs vserver cs1 -lbvserver lb1"),
            "ns.conf",
        )
        .expect("parse");
        assert_eq!(stmt.opts.get_str("-lbvserver"), Some("lb1"));
    }

    #[test]
    fn quoted_name_is_preserved() {
        let stmt = parse_statement(
            &line("add lb vserver \"my app\" HTTP 10.0.0.5 *"),
            "ns.conf",
        )
        .expect("parse");
        assert_eq!(stmt.name(), Some("\"my app\""));
        assert_eq!(stmt.positional(2), Some("*"));
    }

    #[test]
    fn unknown_lines_are_pass_through() {
        let stmt = parse_statement(&line("save ns config"), "ns.conf").expect("parse");
        assert_eq!(stmt.kind, StatementKind::PassThrough);
        assert_eq!(stmt.raw, "save ns config");
    }

    #[test]
    fn bad_line_is_recorded_and_rest_continue() {
        let text = "add server s1 10.0.0.1\nadd server \"oops 10.0.0.2\nadd server s3 10.0.0.3\n";
        let parsed = parse_config(text, "ns.conf");
        assert_eq!(parsed.statements.len(), 2);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].line, 2);
        assert_eq!(parsed.errors[0].source_name, "ns.conf");
    }

    #[test]
    fn add_without_name_is_malformed() {
        let err = parse_statement(&line("add lb vserver -lbMethod ROUNDROBIN"), "ns.conf")
            .expect_err("should fail");
        assert!(err.reason.contains("requires an object name"));
    }
}

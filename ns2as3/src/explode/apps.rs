use std::collections::HashSet;

use nsconf_core::{OptValue, OptionMap, Statement};

use super::index::ConfigIndex;
use super::LineSet;
use crate::diagnostics::{codes, Diagnostic, Diagnostics};
use crate::model::{
    AdcApp, AppType, CertBinding, GroupMember, Monitor, PolicyBinding, ServerAddress,
    ServiceBinding, ServiceGroupBinding, WILDCARD_PORT,
};

/// Monitors the device ships with; they need no `add lb monitor`.
pub const BUILTIN_MONITORS: &[&str] = &[
    "ping",
    "ping-default",
    "tcp",
    "tcp-default",
    "http",
    "https",
    "arp",
    "nd6",
];

/// Phase 1: one application per defining statement.
pub(crate) fn define(index: &ConfigIndex<'_>, diags: &mut Diagnostics) -> Vec<AdcApp> {
    let mut seen = HashSet::new();
    let mut apps = Vec::new();

    for (app_type, stmt) in &index.vservers {
        let Some(name) = stmt.name() else {
            continue;
        };
        if !seen.insert((*app_type, name)) {
            diags.push(
                Diagnostic::warning(
                    codes::DUPLICATE_APPLICATION,
                    format!("{app_type} {name} is defined more than once; keeping the first"),
                )
                .at(stmt.source.clone(), stmt.line),
            );
            continue;
        }

        let mut app = AdcApp::new(name, *app_type, stmt.positional(0).unwrap_or_default());
        if *app_type != AppType::GlobalTraffic {
            app.ip_address = stmt.positional(1).map(str::to_string);
            app.port = stmt.positional(2).map(str::to_string);
        }
        app.opts = stmt.opts.clone();
        app.lines = Some(vec![stmt.raw.clone()]);
        apps.push(app);
    }

    apps
}

/// Phases 2, 3 and 5 for one application: classify binds, resolve groups
/// and monitors, and accumulate the contributing lines.
pub(crate) fn attach(app: &mut AdcApp, index: &ConfigIndex<'_>, diags: &mut Diagnostics) {
    let mut lines = LineSet::from(app.lines.take().unwrap_or_default());

    for set in index.sets_for(app.app_type, &app.name) {
        app.opts.merge(&set.opts);
        lines.push(&set.raw);
    }

    for bind in index.binds_for(app.app_type, &app.name) {
        lines.push(&bind.raw);

        if let Some(target) = bind.positional(0) {
            if let Some(svc) = index.services.get(target) {
                let binding = service_binding(svc, bind, index, &mut lines, diags);
                app.bindings.services.push(binding);
            } else if let Some(group) = index.service_groups.get(target) {
                let binding = group_binding(group, index, &mut lines, diags);
                app.bindings.service_groups.push(binding);
            } else {
                diags.push(dangling(bind, &app.name, "service or serviceGroup", target));
            }
        }

        if let Some(policy) = bind.opts.get("-policyName").and_then(OptValue::as_map) {
            if let Some(binding) = policy_binding(policy, bind, index, &mut lines, diags) {
                app.bindings.policies.push(binding);
            }
        }

        if let Some(lb) = bind.opts.get_str("-lbvserver") {
            app.bindings.default_lb = Some(lb.to_string());
        }
    }

    if app.app_type != AppType::GlobalTraffic {
        let mut ssl_opts = OptionMap::new();
        for set in index.ssl_sets_for(&app.name) {
            ssl_opts.merge(&set.opts);
            lines.push(&set.raw);
        }
        for bind in index.ssl_binds_for(&app.name) {
            lines.push(&bind.raw);
            if let Some(certkey) = bind.opts.get("-certkeyName").and_then(OptValue::as_map) {
                if let Some(binding) = cert_binding(certkey, &ssl_opts, bind, index, &mut lines, diags)
                {
                    app.bindings.certs.push(binding);
                }
            }
        }
    }

    app.lines = Some(lines.into_vec());
}

fn service_binding(
    svc: &Statement,
    bind: &Statement,
    index: &ConfigIndex<'_>,
    lines: &mut LineSet,
    diags: &mut Diagnostics,
) -> ServiceBinding {
    let server = svc.positional(0).unwrap_or_default().to_string();
    let (address, server_enabled) = resolve_server(&server, svc, index, lines, diags);
    lines.push(&svc.raw);

    let mut monitors = Vec::new();
    for svc_bind in index.service_binds_for(svc.name().unwrap_or_default()) {
        lines.push(&svc_bind.raw);
        if let Some(mon) = svc_bind.opts.get("-monitorName").and_then(OptValue::as_map) {
            monitors.extend(monitor(mon, svc_bind, index, lines, diags));
        }
    }

    let mut opts = svc.opts.clone();
    opts.merge(&bind.opts);

    ServiceBinding {
        name: svc.name().unwrap_or_default().to_string(),
        server,
        address,
        protocol: svc.positional(1).unwrap_or_default().to_string(),
        port: svc.positional(2).unwrap_or(WILDCARD_PORT).to_string(),
        enabled: server_enabled && index.is_enabled(svc),
        opts,
        monitors,
    }
}

fn group_binding(
    group: &Statement,
    index: &ConfigIndex<'_>,
    lines: &mut LineSet,
    diags: &mut Diagnostics,
) -> ServiceGroupBinding {
    lines.push(&group.raw);
    let name = group.name().unwrap_or_default();
    let mut servers = Vec::new();
    let mut monitors = Vec::new();

    for bind in index.group_binds_for(name) {
        if let Some(server) = bind.positional(0) {
            let (address, server_enabled) = resolve_server(server, bind, index, lines, diags);
            servers.push(GroupMember {
                server: server.to_string(),
                address,
                port: bind.positional(1).unwrap_or(WILDCARD_PORT).to_string(),
                enabled: server_enabled && index.is_enabled(bind),
                opts: bind.opts.clone(),
            });
        }
        lines.push(&bind.raw);
        if let Some(mon) = bind.opts.get("-monitorName").and_then(OptValue::as_map) {
            monitors.extend(monitor(mon, bind, index, lines, diags));
        }
    }

    ServiceGroupBinding {
        name: name.to_string(),
        protocol: group.positional(0).unwrap_or_default().to_string(),
        servers,
        opts: group.opts.clone(),
        monitors,
    }
}

/// Address and enabled state for a server name.
///
/// Undefined names that are literal IPs stand for themselves, as the device
/// auto-creates such servers.
fn resolve_server(
    server: &str,
    referrer: &Statement,
    index: &ConfigIndex<'_>,
    lines: &mut LineSet,
    diags: &mut Diagnostics,
) -> (Option<ServerAddress>, bool) {
    if let Some(def) = index.servers.get(server) {
        lines.push(&def.raw);
        let address = def
            .positional(0)
            .or_else(|| def.opts.get_str("-domain"))
            .map(ServerAddress::parse);
        return (address, index.is_enabled(def));
    }
    match ServerAddress::parse(server) {
        ip @ ServerAddress::Ip(_) => (Some(ip), true),
        ServerAddress::Hostname(_) => {
            diags.push(
                Diagnostic::warning(
                    codes::UNRESOLVED_SERVER,
                    format!("server {server} has no definition and is not an IP address"),
                )
                .at(referrer.source.clone(), referrer.line),
            );
            (None, true)
        }
    }
}

fn monitor(
    sub: &OptionMap,
    bind: &Statement,
    index: &ConfigIndex<'_>,
    lines: &mut LineSet,
    diags: &mut Diagnostics,
) -> Option<Monitor> {
    let name = sub.get_str("name")?;
    if let Some(def) = index.monitors.get(name) {
        lines.push(&def.raw);
        return Some(Monitor {
            name: name.to_string(),
            monitor_type: def.positional(0).map(str::to_string),
            builtin: false,
            opts: def.opts.clone(),
        });
    }
    if BUILTIN_MONITORS
        .iter()
        .any(|b| b.eq_ignore_ascii_case(name))
    {
        return Some(Monitor {
            name: name.to_string(),
            monitor_type: None,
            builtin: true,
            opts: OptionMap::new(),
        });
    }
    diags.push(dangling(bind, bind.name().unwrap_or_default(), "lb monitor", name));
    None
}

fn policy_binding(
    sub: &OptionMap,
    bind: &Statement,
    index: &ConfigIndex<'_>,
    lines: &mut LineSet,
    diags: &mut Diagnostics,
) -> Option<PolicyBinding> {
    let name = sub.get_str("name")?;
    let mut binding = PolicyBinding {
        name: name.to_string(),
        priority: sub.get_str("-priority").map(str::to_string),
        target: sub.get_str("-targetLBVserver").map(str::to_string),
        rule: None,
        opts: without_name(sub),
    };

    let Some(def) = index.policies.get(name) else {
        diags.push(dangling(bind, bind.name().unwrap_or_default(), "policy", name));
        return Some(binding);
    };
    lines.push(&def.raw);
    binding.rule = def
        .opts
        .get_str("-rule")
        .or_else(|| def.positional(0))
        .map(str::to_string);

    let action_name = def.opts.get_str("-action").or_else(|| def.positional(1));
    if let Some(action) = action_name.and_then(|a| index.actions.get(a)) {
        lines.push(&action.raw);
        if binding.target.is_none() {
            binding.target = action.opts.get_str("-targetLBVserver").map(str::to_string);
        }
    }

    Some(binding)
}

fn cert_binding(
    sub: &OptionMap,
    ssl_opts: &OptionMap,
    bind: &Statement,
    index: &ConfigIndex<'_>,
    lines: &mut LineSet,
    diags: &mut Diagnostics,
) -> Option<CertBinding> {
    let certkey = sub.get_str("name")?;
    let def = index.certkeys.get(certkey);
    match def {
        Some(def) => lines.push(&def.raw),
        None => diags.push(dangling(bind, bind.name().unwrap_or_default(), "ssl certKey", certkey)),
    }

    let path = |flag: &str| {
        def.and_then(|d| d.opts.get_str(flag))
            .map(|p| p.trim_matches('"').to_string())
    };

    Some(CertBinding {
        certkey: certkey.to_string(),
        cert: path("-cert"),
        key: path("-key"),
        opts: without_name(sub),
        ssl_opts: ssl_opts.clone(),
    })
}

fn without_name(sub: &OptionMap) -> OptionMap {
    let mut opts = sub.clone();
    opts.remove("name");
    opts
}

fn dangling(stmt: &Statement, owner: &str, kind: &str, target: &str) -> Diagnostic {
    Diagnostic::warning(
        codes::DANGLING_REFERENCE,
        format!("{owner} references undefined {kind} {target}"),
    )
    .at(stmt.source.clone(), stmt.line)
}

#[cfg(test)]
mod tests {
    use super::{attach, define};
    use crate::diagnostics::{codes, Diagnostics};
    use crate::explode::index::ConfigIndex;
    use crate::model::ServerAddress;
    use nsconf_core::parse_config;

    const CONFIG: &str = "\
add server web01 10.1.1.11
add server web02 app.example.com
add serviceGroup web_sg HTTP -maxClient 0
bind serviceGroup web_sg web01 8080
bind serviceGroup web_sg web02 8080 -state DISABLED
bind serviceGroup web_sg -monitorName hc_http
add lb monitor hc_http HTTP -respCode 200 -httpRequest \"GET /health\"
add service svc1 10.1.1.20 HTTP 8080
add lb vserver web_app HTTP 10.1.1.100 80 -lbMethod ROUNDROBIN
set lb vserver web_app -cltTimeout 300
bind lb vserver web_app web_sg
bind lb vserver web_app svc1
bind lb vserver web_app missing_sg
";

    fn build() -> (Vec<crate::model::AdcApp>, Diagnostics) {
        let parsed = parse_config(CONFIG, "ns.conf");
        let index = ConfigIndex::build(&parsed.statements);
        let mut diags = Diagnostics::new();
        let mut apps = define(&index, &mut diags);
        for app in &mut apps {
            attach(app, &index, &mut diags);
        }
        (apps, diags)
    }

    #[test]
    fn resolves_group_members_and_monitors() {
        let (apps, _) = build();
        let app = &apps[0];
        let group = &app.bindings.service_groups[0];

        assert_eq!(group.servers.len(), 2);
        assert_eq!(
            group.servers[0].address,
            Some(ServerAddress::Ip("10.1.1.11".to_string()))
        );
        assert_eq!(
            group.servers[1].address,
            Some(ServerAddress::Hostname("app.example.com".to_string()))
        );
        assert!(!group.servers[1].enabled);
        assert_eq!(group.monitors[0].monitor_type.as_deref(), Some("HTTP"));
    }

    #[test]
    fn literal_ip_service_needs_no_server_definition() {
        let (apps, _) = build();
        let svc = &apps[0].bindings.services[0];
        assert_eq!(svc.address, Some(ServerAddress::Ip("10.1.1.20".to_string())));
        assert_eq!(svc.port, "8080");
    }

    #[test]
    fn set_statement_merges_into_opts() {
        let (apps, _) = build();
        assert_eq!(apps[0].opts.get_str("-cltTimeout"), Some("300"));
        assert_eq!(apps[0].opts.get_str("-lbMethod"), Some("ROUNDROBIN"));
    }

    #[test]
    fn lines_cover_every_contributing_statement() {
        let (apps, _) = build();
        let lines = apps[0].lines();
        for expected in [
            "add lb vserver web_app HTTP 10.1.1.100 80 -lbMethod ROUNDROBIN",
            "set lb vserver web_app -cltTimeout 300",
            "bind lb vserver web_app web_sg",
            "add server web01 10.1.1.11",
            "bind serviceGroup web_sg -monitorName hc_http",
            "add lb monitor hc_http HTTP -respCode 200 -httpRequest \"GET /health\"",
            "add service svc1 10.1.1.20 HTTP 8080",
        ] {
            assert!(lines.iter().any(|l| l == expected), "missing line {expected}");
        }
        let unique: std::collections::HashSet<_> = lines.iter().collect();
        assert_eq!(unique.len(), lines.len());
    }

    #[test]
    fn unknown_bind_target_is_a_diagnostic() {
        let (apps, diags) = build();
        assert_eq!(apps.len(), 1);
        assert!(diags
            .iter()
            .any(|d| d.code == codes::DANGLING_REFERENCE && d.message.contains("missing_sg")));
    }

    #[test]
    fn duplicate_definition_keeps_first() {
        let parsed = parse_config(
            "add lb vserver a HTTP 10.0.0.1 80\nadd lb vserver a TCP 10.0.0.2 81\n",
            "ns.conf",
        );
        let index = ConfigIndex::build(&parsed.statements);
        let mut diags = Diagnostics::new();
        let apps = define(&index, &mut diags);
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].protocol, "HTTP");
        assert_eq!(diags.len(), 1);
    }
}

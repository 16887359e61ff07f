use nsconf_core::OptionMap;
use serde_json::{json, Map, Value};

use super::mappings::{builtin_monitor, monitor_type};
use super::naming::AppNames;
use crate::model::{AdcApp, Monitor, ServerAddress, WILDCARD_PORT};

const DEFAULT_INTERVAL: u64 = 5;

/// Pool members, monitor references and generated monitor objects for one app.
#[derive(Debug, Default)]
pub(crate) struct PoolParts {
    pub members: Vec<Value>,
    pub monitor_refs: Vec<Value>,
    /// `(name, Monitor object)` in generation order.
    pub monitors: Vec<(String, Value)>,
    /// Manual follow-ups discovered while mapping.
    pub notes: Vec<String>,
}

pub(crate) fn collect(app: &AdcApp, names: &AppNames) -> PoolParts {
    let mut parts = PoolParts::default();
    let mut seen_monitors: Vec<&str> = Vec::new();

    for svc in &app.bindings.services {
        match &svc.address {
            Some(address) => push_member(&mut parts, address, &svc.port, svc.enabled, &svc.opts),
            None => parts
                .notes
                .push(format!("service {} has no resolvable address", svc.name)),
        }
        for mon in &svc.monitors {
            push_monitor(&mut parts, &mut seen_monitors, mon, names);
        }
    }

    for group in &app.bindings.service_groups {
        for member in &group.servers {
            match &member.address {
                Some(address) => {
                    push_member(&mut parts, address, &member.port, member.enabled, &member.opts)
                }
                None => parts.notes.push(format!(
                    "member {} of {} has no resolvable address",
                    member.server, group.name
                )),
            }
        }
        for mon in &group.monitors {
            push_monitor(&mut parts, &mut seen_monitors, mon, names);
        }
    }

    parts
}

fn push_member(
    parts: &mut PoolParts,
    address: &ServerAddress,
    port: &str,
    enabled: bool,
    opts: &OptionMap,
) {
    let Some(service_port) = member_port(port) else {
        parts.notes.push(format!("member port {port} is not numeric"));
        return;
    };

    let mut member = match address {
        ServerAddress::Ip(ip) => json!({
            "servicePort": service_port,
            "serverAddresses": [ip],
        }),
        ServerAddress::Hostname(host) => json!({
            "servicePort": service_port,
            "addressDiscovery": "fqdn",
            "autoPopulate": true,
            "hostname": host,
        }),
    };
    if let Some(obj) = member.as_object_mut() {
        if let Some(weight) = opts.get_str("-weight").and_then(|w| w.parse::<u64>().ok()) {
            obj.insert("ratio".to_string(), json!(weight));
        }
        obj.insert("enable".to_string(), json!(enabled));
        obj.insert("shareNodes".to_string(), json!(true));
    }
    parts.members.push(member);
}

fn member_port(port: &str) -> Option<u16> {
    let port = port.trim();
    if port == WILDCARD_PORT {
        return Some(0);
    }
    port.parse().ok()
}

fn push_monitor<'m>(
    parts: &mut PoolParts,
    seen: &mut Vec<&'m str>,
    mon: &'m Monitor,
    names: &AppNames,
) {
    if seen.contains(&mon.name.as_str()) {
        return;
    }
    seen.push(&mon.name);

    if mon.builtin {
        if let Some(pointer) = builtin_monitor(&mon.name) {
            parts.monitor_refs.push(json!({ "bigip": pointer }));
        }
        return;
    }

    let name = names.monitor(parts.monitors.len());
    let (object, note) = monitor_object(mon);
    if let Some(note) = note {
        parts.notes.push(format!("monitor {name}: {note}"));
    }
    parts.monitor_refs.push(json!({ "use": name }));
    parts.monitors.push((name, object));
}

/// AS3 Monitor object plus a follow-up note when it cannot be fully mapped.
fn monitor_object(mon: &Monitor) -> (Value, Option<String>) {
    let kind = mon.monitor_type.as_deref().unwrap_or_default();
    let secure = mon
        .opts
        .get_str("-secure")
        .is_some_and(|v| v.eq_ignore_ascii_case("YES"));
    let mapping = monitor_type(kind, secure);
    let interval = mon
        .opts
        .get_str("-interval")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_INTERVAL);

    let mut obj = Map::new();
    obj.insert("class".to_string(), json!("Monitor"));
    obj.insert("monitorType".to_string(), json!(mapping.monitor_type));
    obj.insert("interval".to_string(), json!(interval));
    obj.insert(
        "timeout".to_string(),
        json!(interval.saturating_mul(3).saturating_add(1)),
    );

    let opt = |flag: &str| mon.opts.get_str(flag).map(unquote);
    match mapping.monitor_type {
        "http" | "https" => {
            let request = opt("-httpRequest")
                .or_else(|| opt("-send"))
                .unwrap_or_else(|| "GET /".to_string());
            obj.insert("send".to_string(), json!(http_send(&request)));
            if let Some(receive) = opt("-recv").or_else(|| opt("-respCode")) {
                obj.insert("receive".to_string(), json!(receive));
            }
        }
        "tcp" | "udp" => {
            if let Some(send) = opt("-send") {
                obj.insert("send".to_string(), json!(send));
            }
            if let Some(receive) = opt("-recv") {
                obj.insert("receive".to_string(), json!(receive));
            }
        }
        "dns" => {
            if let Some(query) = opt("-query") {
                obj.insert("queryName".to_string(), json!(query));
            }
            obj.insert("queryType".to_string(), json!("a"));
        }
        _ => {}
    }

    let note = mapping.manual.then(|| {
        let script = opt("-scriptName").unwrap_or_else(|| mon.name.clone());
        obj.insert("pathname".to_string(), json!(format!("/Common/{script}")));
        obj.insert(
            "remark".to_string(),
            json!(format!("manual follow-up: {kind} monitor {}", mon.name)),
        );
        format!("{kind} monitor {} needs an external script", mon.name)
    });

    (Value::Object(obj), note)
}

fn http_send(request: &str) -> String {
    if request.contains("HTTP/") {
        format!("{request}\r\n\r\n")
    } else {
        format!("{request} HTTP/1.1\r\nHost: \r\nConnection: Close\r\n\r\n")
    }
}

fn unquote(value: &str) -> String {
    value.trim_matches('"').to_string()
}

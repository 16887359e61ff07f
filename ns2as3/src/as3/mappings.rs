//! Dialect → AS3 mapping tables. All lookups are case-insensitive.

/// Application options consumed by the builder.
pub const MAPPED_OPTIONS: &[&str] = &[
    "-lbMethod",
    "-persistenceType",
    "-state",
    "-comment",
    "-targetLBVserver",
];

pub const DEFAULT_LB_MODE: &str = "round-robin";
pub const DEFAULT_SERVICE_CLASS: &str = "Service_Generic";

const LB_METHODS: &[(&str, &str)] = &[
    ("ROUNDROBIN", "round-robin"),
    ("LEASTCONNECTION", "least-connections-member"),
    ("LEASTRESPONSETIME", "fastest-app-response"),
    ("LEASTBANDWIDTH", "least-sessions"),
    ("LEASTPACKETS", "least-sessions"),
    ("SOURCEIPHASH", "predictive-member"),
    ("CUSTOMLOAD", "dynamic-ratio-member"),
];

const PERSISTENCE: &[(&str, &str)] = &[
    ("SOURCEIP", "source-address"),
    ("COOKIEINSERT", "cookie"),
    ("SSLSESSION", "tls-session-id"),
    ("DESTIP", "destination-address"),
];

/// How a service class treats TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    None,
    /// Client TLS terminates on the virtual server.
    Terminate,
    /// Encrypted traffic is forwarded untouched.
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceClass {
    pub class: &'static str,
    pub tls: TlsMode,
}

const SERVICE_CLASSES: &[(&str, ServiceClass)] = &[
    ("HTTP", ServiceClass { class: "Service_HTTP", tls: TlsMode::None }),
    ("SSL", ServiceClass { class: "Service_HTTPS", tls: TlsMode::Terminate }),
    ("SSL_BRIDGE", ServiceClass { class: "Service_TCP", tls: TlsMode::Passthrough }),
    ("SSL_TCP", ServiceClass { class: "Service_TCP", tls: TlsMode::Terminate }),
    ("TCP", ServiceClass { class: "Service_TCP", tls: TlsMode::None }),
    ("FTP", ServiceClass { class: "Service_TCP", tls: TlsMode::None }),
    ("DNS_TCP", ServiceClass { class: "Service_TCP", tls: TlsMode::None }),
    ("MYSQL", ServiceClass { class: "Service_TCP", tls: TlsMode::None }),
    ("MSSQL", ServiceClass { class: "Service_TCP", tls: TlsMode::None }),
    ("RDP", ServiceClass { class: "Service_TCP", tls: TlsMode::None }),
    ("UDP", ServiceClass { class: "Service_UDP", tls: TlsMode::None }),
    ("DNS", ServiceClass { class: "Service_UDP", tls: TlsMode::None }),
    ("RADIUS", ServiceClass { class: "Service_UDP", tls: TlsMode::None }),
    ("SIP_UDP", ServiceClass { class: "Service_UDP", tls: TlsMode::None }),
    ("ANY", ServiceClass { class: "Service_L4", tls: TlsMode::None }),
];

/// Monitor types the device ships with, as `bigip` pointers.
const BUILTIN_MONITORS: &[(&str, &str)] = &[
    ("ping", "/Common/gateway_icmp"),
    ("ping-default", "/Common/gateway_icmp"),
    ("tcp", "/Common/tcp"),
    ("tcp-default", "/Common/tcp"),
    ("http", "/Common/http"),
    ("https", "/Common/https"),
    ("arp", "/Common/gateway_icmp"),
    ("nd6", "/Common/gateway_icmp"),
];

/// Target monitor type plus whether it needs hand-finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorMapping {
    pub monitor_type: &'static str,
    pub manual: bool,
}

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    let key = key.trim();
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| *v)
}

/// `-lbMethod` → `loadBalancingMode`; unknown or absent is round-robin.
pub fn lb_method(method: Option<&str>) -> &'static str {
    method
        .and_then(|m| lookup(LB_METHODS, m))
        .unwrap_or(DEFAULT_LB_MODE)
}

/// `-persistenceType` → persistence method; `None` means no persistence.
pub fn persistence(kind: Option<&str>) -> Option<&'static str> {
    kind.and_then(|k| lookup(PERSISTENCE, k))
}

/// Protocol → service class; unknown protocols get [`DEFAULT_SERVICE_CLASS`].
pub fn service_class(protocol: &str) -> ServiceClass {
    lookup(SERVICE_CLASSES, protocol).unwrap_or(ServiceClass {
        class: DEFAULT_SERVICE_CLASS,
        tls: TlsMode::None,
    })
}

/// `add lb monitor <name> <type>` → AS3 `monitorType`.
///
/// `secure` is the monitor's `-secure YES` flag.
pub fn monitor_type(kind: &str, secure: bool) -> MonitorMapping {
    let auto = |monitor_type: &'static str| MonitorMapping {
        monitor_type,
        manual: false,
    };
    match kind.trim().to_ascii_uppercase().as_str() {
        "HTTP" | "HTTP-ECV" if secure => auto("https"),
        "HTTP" | "HTTP-ECV" => auto("http"),
        "HTTP-INLINE" => auto("http"),
        "TCP" | "TCP-ECV" => auto("tcp"),
        "PING" => auto("icmp"),
        "UDP" | "UDP-ECV" => auto("udp"),
        "DNS" | "DNS-TCP" => auto("dns"),
        "LDAP" => auto("ldap"),
        "RADIUS" => auto("radius"),
        "SIP-UDP" => auto("sip"),
        "MYSQL" => auto("mysql"),
        _ => MonitorMapping {
            monitor_type: "external",
            manual: true,
        },
    }
}

/// `bigip` pointer for a built-in monitor name.
pub fn builtin_monitor(name: &str) -> Option<&'static str> {
    lookup(BUILTIN_MONITORS, name)
}

pub fn is_mapped_option(flag: &str) -> bool {
    MAPPED_OPTIONS.iter().any(|m| m.eq_ignore_ascii_case(flag))
}

#[cfg(test)]
mod tests {
    use super::{
        builtin_monitor, is_mapped_option, lb_method, monitor_type, persistence, service_class,
        TlsMode, DEFAULT_SERVICE_CLASS,
    };

    #[test]
    fn lb_method_defaults_to_round_robin() {
        assert_eq!(lb_method(Some("leastconnection")), "least-connections-member");
        assert_eq!(lb_method(Some("TOKEN")), "round-robin");
        assert_eq!(lb_method(None), "round-robin");
    }

    #[test]
    fn persistence_none_and_unknown_map_to_none() {
        assert_eq!(persistence(Some("SOURCEIP")), Some("source-address"));
        assert_eq!(persistence(Some("cookieinsert")), Some("cookie"));
        assert_eq!(persistence(Some("NONE")), None);
        assert_eq!(persistence(Some("CALLID")), None);
    }

    #[test]
    fn ssl_termination_and_passthrough_differ() {
        let terminate = service_class("SSL");
        let bridge = service_class("ssl_bridge");
        assert_eq!(terminate.class, "Service_HTTPS");
        assert_eq!(terminate.tls, TlsMode::Terminate);
        assert_eq!(bridge.class, "Service_TCP");
        assert_eq!(bridge.tls, TlsMode::Passthrough);
    }

    #[test]
    fn unknown_protocol_gets_default_class() {
        let class = service_class("DIAMETER");
        assert_eq!(class.class, DEFAULT_SERVICE_CLASS);
        assert_eq!(class.tls, TlsMode::None);
    }

    #[test]
    fn script_monitors_need_manual_follow_up() {
        assert_eq!(monitor_type("HTTP-ECV", true).monitor_type, "https");
        assert!(!monitor_type("ping", false).manual);
        let user = monitor_type("USER", false);
        assert_eq!(user.monitor_type, "external");
        assert!(user.manual);
    }

    #[test]
    fn builtin_and_mapped_lookups() {
        assert_eq!(builtin_monitor("PING"), Some("/Common/gateway_icmp"));
        assert_eq!(builtin_monitor("custom"), None);
        assert!(is_mapped_option("-LBMETHOD"));
        assert!(!is_mapped_option("-td"));
    }
}

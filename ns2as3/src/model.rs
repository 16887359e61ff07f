//! Normalized application model produced by extraction.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use nsconf_core::OptionMap;
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::loader::InputFileType;

/// Port marker the dialect uses for "any port".
pub const WILDCARD_PORT: &str = "*";

/// One input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub name: String,
    pub size: usize,
    pub content: String,
}

impl Source {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            size: content.len(),
            content,
        }
    }
}

/// Kind of virtual server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppType {
    LoadBalancer,
    ContentSwitch,
    GlobalTraffic,
}

impl AppType {
    /// Dialect object type that defines this kind of application.
    pub fn object_type(self) -> &'static str {
        match self {
            AppType::LoadBalancer => "lb vserver",
            AppType::ContentSwitch => "cs vserver",
            AppType::GlobalTraffic => "gslb vserver",
        }
    }

    pub fn from_object_type(object_type: &str) -> Option<Self> {
        [
            AppType::LoadBalancer,
            AppType::ContentSwitch,
            AppType::GlobalTraffic,
        ]
        .into_iter()
        .find(|t| t.object_type().eq_ignore_ascii_case(object_type))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppType::LoadBalancer => "load-balancer",
            AppType::ContentSwitch => "content-switch",
            AppType::GlobalTraffic => "global-traffic",
        }
    }
}

impl Display for AppType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a backend server is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerAddress {
    Ip(String),
    Hostname(String),
}

impl ServerAddress {
    /// Classify a dialect server address token.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim_matches('"');
        if trimmed.parse::<std::net::IpAddr>().is_ok() {
            ServerAddress::Ip(trimmed.to_string())
        } else {
            ServerAddress::Hostname(trimmed.to_string())
        }
    }
}

/// Health monitor attached to a service or service group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub name: String,
    /// Dialect monitor type, `None` for built-in monitors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_type: Option<String>,
    pub builtin: bool,
    /// Options from the monitor's own definition.
    pub opts: OptionMap,
}

/// `bind lb vserver <app> <service>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBinding {
    pub name: String,
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ServerAddress>,
    pub protocol: String,
    pub port: String,
    pub enabled: bool,
    pub opts: OptionMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub monitors: Vec<Monitor>,
}

/// `bind serviceGroup <group> <server> <port>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ServerAddress>,
    pub port: String,
    pub enabled: bool,
    pub opts: OptionMap,
}

/// `bind lb vserver <app> <serviceGroup>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceGroupBinding {
    pub name: String,
    pub protocol: String,
    pub servers: Vec<GroupMember>,
    pub opts: OptionMap,
    pub monitors: Vec<Monitor>,
}

/// `bind ssl vserver <app> -certkeyName <ck>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertBinding {
    pub certkey: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Options on the bind itself (`-SNICert`, `-CA`, ...).
    pub opts: OptionMap,
    /// Options from `set ssl vserver <app>`.
    pub ssl_opts: OptionMap,
}

impl CertBinding {
    pub fn is_ca(&self) -> bool {
        self.opts.contains_key("-CA")
    }
}

/// Policy bound to an application, optionally naming a target application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBinding {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub opts: OptionMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bindings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceBinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service_groups: Vec<ServiceGroupBinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub certs: Vec<CertBinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<PolicyBinding>,
    /// `bind cs vserver <app> -lbvserver <lb>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_lb: Option<String>,
}

impl Bindings {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
            && self.service_groups.is_empty()
            && self.certs.is_empty()
            && self.policies.is_empty()
            && self.default_lb.is_none()
    }
}

/// One virtual server plus everything bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdcApp {
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: AppType,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub opts: OptionMap,
    #[serde(skip_serializing_if = "Bindings::is_empty")]
    pub bindings: Bindings,
    /// Detached copies of the applications a content switch dispatches to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<AdcApp>,
    /// Raw statements attributed to this application. Absent on nested copies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl AdcApp {
    pub fn new(name: impl Into<String>, app_type: AppType, protocol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app_type,
            protocol: protocol.into(),
            ip_address: None,
            port: None,
            opts: OptionMap::new(),
            bindings: Bindings::default(),
            apps: Vec::new(),
            lines: Some(Vec::new()),
            diagnostics: Vec::new(),
        }
    }

    /// True when the port is absent or the wildcard marker.
    pub fn is_wildcard_port(&self) -> bool {
        self.port
            .as_deref()
            .map_or(true, |port| port.trim() == WILDCARD_PORT)
    }

    pub fn lines(&self) -> &[String] {
        self.lines.as_deref().unwrap_or(&[])
    }

    /// Structurally independent copy for embedding in a content switch.
    pub fn detached_copy(&self) -> AdcApp {
        let mut copy = self.clone();
        copy.lines = None;
        copy.diagnostics.clear();
        copy
    }

    /// Nested copy with the given name.
    pub fn nested(&self, name: &str) -> Option<&AdcApp> {
        self.apps.iter().find(|a| a.name == name)
    }
}

/// Wall-clock time spent per phase, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimings {
    pub load_ms: f64,
    pub parse_ms: f64,
    pub explode_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub statements: usize,
    pub pass_through: usize,
    pub parse_errors: usize,
    pub apps: usize,
    pub apps_by_type: BTreeMap<String, usize>,
    pub source_version: String,
    pub version_assumed: bool,
    pub timings: PhaseTimings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplodedConfig {
    pub sources: Vec<Source>,
    pub apps: Vec<AdcApp>,
}

/// Complete result of one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explosion {
    pub id: String,
    pub date_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub input_file_type: InputFileType,
    pub config: ExplodedConfig,
    pub stats: Stats,
    /// Run-level findings not tied to one application.
    pub diagnostics: Vec<Diagnostic>,
}

impl Explosion {
    pub fn apps(&self) -> &[AdcApp] {
        &self.config.apps
    }

    pub fn find_app(&self, name: &str) -> Option<&AdcApp> {
        self.config.apps.iter().find(|a| a.name == name)
    }
}

//! AS3 declaration building.
//!
//! Each application becomes one tenant holding one `Application` container:
//!
//! ```text
//! t_<name>
//! └── <name>_<proto><port>
//!     ├── <..>_vs     Service_* (class chosen by protocol)
//!     ├── <..>_pool   Pool, only when a member resolved
//!     ├── <..>_mon..  Monitor, one per non-built-in monitor
//!     ├── <..>_tls    TLS_Server, for terminating services with certificates
//!     └── <..>_cert.. Certificate, referencing device files
//! ```

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::model::{AdcApp, AppType};

pub mod mappings;
pub mod naming;
pub mod options;
mod pool;

pub use naming::{sanitize, AppNames};
pub use options::{load_options, BuildOptions, OptionsLoadError};

use mappings::{lb_method, persistence, service_class, TlsMode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("{name}: {app_type} applications are not supported")]
    UnsupportedApplicationType { name: String, app_type: AppType },
    #[error("{name}: invalid application: {reason}")]
    InvalidApplication { name: String, reason: String },
    #[error("{name}: application {application} in tenant {tenant} was already produced by {existing}")]
    NameCollision {
        name: String,
        tenant: String,
        application: String,
        existing: String,
    },
}

/// Declaration fragment for one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDeclaration {
    pub app: String,
    pub tenant: String,
    pub application: String,
    /// The `Tenant` object keyed by `tenant` in the ADC declaration.
    pub tenant_body: Value,
    /// Things a human still has to finish.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Outcome of building one application in bulk mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkEntry {
    pub app: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkBuild {
    /// Merged declaration, absent when nothing succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Value>,
    pub results: Vec<BulkEntry>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Build the declaration fragment for one application.
pub fn build(app: &AdcApp, opts: &BuildOptions) -> Result<AppDeclaration, BuildError> {
    if app.app_type == AppType::GlobalTraffic {
        return Err(BuildError::UnsupportedApplicationType {
            name: app.name.clone(),
            app_type: app.app_type,
        });
    }
    let invalid = |reason: &str| BuildError::InvalidApplication {
        name: app.name.clone(),
        reason: reason.to_string(),
    };
    if app.name.trim().trim_matches('"').trim().is_empty() {
        return Err(invalid("missing name"));
    }
    if app.protocol.trim().is_empty() {
        return Err(invalid("missing protocol"));
    }
    let virtual_port = match app.port.as_deref().map(str::trim) {
        _ if app.is_wildcard_port() => 0,
        Some(port) => port
            .parse::<u16>()
            .map_err(|_| invalid(&format!("port {port} is not numeric")))?,
        None => 0,
    };

    let names = AppNames::for_app(app, opts);
    let members_from = pool_source(app);
    let parts = pool::collect(members_from, &names);
    let mut notes = parts.notes;

    let class = service_class(&app.protocol);
    let mut container = Map::new();
    container.insert("class".to_string(), json!("Application"));
    container.insert("template".to_string(), json!("generic"));

    let mut service = Map::new();
    service.insert("class".to_string(), json!(class.class));
    service.insert(
        "virtualAddresses".to_string(),
        json!([app.ip_address.as_deref().unwrap_or("0.0.0.0")]),
    );
    service.insert("virtualPort".to_string(), json!(virtual_port));
    let methods: Vec<&str> = persistence(app.opts.get_str("-persistenceType"))
        .into_iter()
        .collect();
    service.insert("persistenceMethods".to_string(), json!(methods));
    if app
        .opts
        .get_str("-state")
        .is_some_and(|s| s.eq_ignore_ascii_case("DISABLED"))
    {
        service.insert("enable".to_string(), json!(false));
    }
    if let Some(remark) = remark(app) {
        service.insert("remark".to_string(), json!(remark));
    }

    if !parts.members.is_empty() {
        service.insert("pool".to_string(), json!(names.pool));
        let mut pool = Map::new();
        pool.insert("class".to_string(), json!("Pool"));
        pool.insert(
            "loadBalancingMode".to_string(),
            json!(lb_method(members_from.opts.get_str("-lbMethod"))),
        );
        pool.insert("members".to_string(), json!(parts.members));
        if !parts.monitor_refs.is_empty() {
            pool.insert("monitors".to_string(), json!(parts.monitor_refs));
        }
        container.insert(names.pool.clone(), Value::Object(pool));
        for (name, monitor) in parts.monitors {
            container.insert(name, monitor);
        }
    }

    if class.tls == TlsMode::Terminate {
        let tls = tls_objects(app, &names, opts, &mut notes);
        match tls {
            Some(objects) => {
                service.insert("serverTLS".to_string(), json!(names.tls));
                for (name, object) in objects {
                    container.insert(name, object);
                }
            }
            None => {
                service.insert("serverTLS".to_string(), json!({ "bigip": "/Common/clientssl" }));
            }
        }
        if class.class == "Service_HTTPS" {
            service.insert("redirect80".to_string(), json!(false));
        }
    }

    container.insert(names.service.clone(), Value::Object(service));

    let mut tenant = Map::new();
    tenant.insert("class".to_string(), json!("Tenant"));
    tenant.insert(names.application.clone(), Value::Object(container));
    let tenant_body = Value::Object(tenant);

    for note in &notes {
        log::debug!("{}: {note}", app.name);
    }

    Ok(AppDeclaration {
        app: app.name.clone(),
        tenant: names.tenant,
        application: names.application,
        tenant_body,
        notes,
    })
}

/// Build every application, keeping going past failures.
pub fn build_bulk(apps: &[AdcApp], opts: &BuildOptions) -> BulkBuild {
    let mut tenants = Map::new();
    let mut results = Vec::with_capacity(apps.len());
    let mut owners: HashMap<(String, String), String> = HashMap::new();
    let mut succeeded = 0;

    for app in apps {
        let built = build(app, opts).and_then(|decl| {
            let key = (decl.tenant.clone(), decl.application.clone());
            match owners.get(&key) {
                Some(existing) => Err(BuildError::NameCollision {
                    name: app.name.clone(),
                    tenant: key.0,
                    application: key.1,
                    existing: existing.clone(),
                }),
                None => {
                    owners.insert(key, app.name.clone());
                    Ok(decl)
                }
            }
        });
        match built {
            Ok(decl) => {
                succeeded += 1;
                results.push(BulkEntry {
                    app: app.name.clone(),
                    tenant: Some(decl.tenant.clone()),
                    error: None,
                });
                merge_tenant(&mut tenants, decl.tenant, decl.tenant_body);
            }
            Err(err) => {
                log::warn!("skipping {}: {err}", app.name);
                results.push(BulkEntry {
                    app: app.name.clone(),
                    tenant: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    let failed = results.len() - succeeded;
    let declaration = (succeeded > 0).then(|| wrap(tenants, opts));
    BulkBuild {
        declaration,
        results,
        succeeded,
        failed,
    }
}

/// Full AS3 request body for a single fragment.
pub fn declaration_for(decl: &AppDeclaration, opts: &BuildOptions) -> Value {
    let mut tenants = Map::new();
    tenants.insert(decl.tenant.clone(), decl.tenant_body.clone());
    wrap(tenants, opts)
}

fn wrap(tenants: Map<String, Value>, opts: &BuildOptions) -> Value {
    let mut adc = Map::new();
    adc.insert("class".to_string(), json!("ADC"));
    adc.insert("schemaVersion".to_string(), json!(opts.schema_version));
    adc.insert("label".to_string(), json!("converted by ns2as3"));
    adc.extend(tenants);
    json!({
        "class": "AS3",
        "action": "deploy",
        "persist": true,
        "declaration": Value::Object(adc),
    })
}

/// Tenants sharing a name (same sanitized app name) pool their applications.
/// Application names within a tenant are unique by the time this runs.
fn merge_tenant(tenants: &mut Map<String, Value>, name: String, body: Value) {
    if let Some(Value::Object(existing)) = tenants.get_mut(&name) {
        if let Value::Object(incoming) = body {
            for (key, value) in incoming {
                existing.entry(key).or_insert(value);
            }
        }
        return;
    }
    tenants.insert(name, body);
}

/// Whether building `app` reads `flag` from the app's own options.
///
/// A content switch that draws its pool from a target vserver takes the
/// balancing method from that target, leaving its own `-lbMethod` unused.
pub fn consumes_option(app: &AdcApp, flag: &str) -> bool {
    if flag.eq_ignore_ascii_case("-lbMethod") && !std::ptr::eq(pool_source(app), app) {
        return false;
    }
    mappings::is_mapped_option(flag)
}

/// Members come from the app itself, or for a content switch from its
/// default target.
fn pool_source(app: &AdcApp) -> &AdcApp {
    if app.app_type != AppType::ContentSwitch {
        return app;
    }
    let default = app
        .bindings
        .default_lb
        .as_deref()
        .or_else(|| app.opts.get_str("-targetLBVserver"));
    default
        .and_then(|name| app.nested(name))
        .or_else(|| app.apps.first())
        .unwrap_or(app)
}

fn remark(app: &AdcApp) -> Option<String> {
    let comment = app.opts.get_str("-comment").map(|c| c.trim_matches('"'));
    let routes: Vec<String> = app
        .bindings
        .policies
        .iter()
        .filter_map(|p| p.target.as_ref().map(|t| format!("{} -> {t}", p.name)))
        .collect();

    match (comment, routes.is_empty()) {
        (None, true) => None,
        (Some(c), true) => Some(c.to_string()),
        (None, false) => Some(format!("policies: {}", routes.join(", "))),
        (Some(c), false) => Some(format!("{c}; policies: {}", routes.join(", "))),
    }
}

/// TLS_Server plus Certificate objects, or `None` to fall back to the
/// platform default profile.
fn tls_objects(
    app: &AdcApp,
    names: &AppNames,
    opts: &BuildOptions,
    notes: &mut Vec<String>,
) -> Option<Vec<(String, Value)>> {
    if opts.skip_tls {
        return None;
    }
    let certs: Vec<_> = app.bindings.certs.iter().filter(|c| !c.is_ca()).collect();
    if certs.is_empty() {
        notes.push("no server certificate bound; using /Common/clientssl".to_string());
        return None;
    }

    let mut objects = Vec::new();
    let mut refs = Vec::new();
    for (idx, cert) in certs.iter().enumerate() {
        let name = names.certificate(idx);
        let cert_file = cert.cert.as_deref().unwrap_or(&cert.certkey);
        let key_file = cert.key.as_deref().unwrap_or(cert_file);
        objects.push((
            name.clone(),
            json!({
                "class": "Certificate",
                "certificate": { "bigip": format!("/Common/{cert_file}") },
                "privateKey": { "bigip": format!("/Common/{key_file}") },
            }),
        ));
        refs.push(json!({ "certificate": name }));
    }

    let mut tls = Map::new();
    tls.insert("class".to_string(), json!("TLS_Server"));
    tls.insert("certificates".to_string(), json!(refs));
    let ssl_opts = &certs[0].ssl_opts;
    if let Some(tls13) = ssl_opts.get_str("-tls13") {
        tls.insert(
            "tls1_3Enabled".to_string(),
            json!(tls13.eq_ignore_ascii_case("ENABLED")),
        );
    }
    objects.push((names.tls.clone(), Value::Object(tls)));
    Some(objects)
}

#[cfg(test)]
mod tests {
    use super::{build, build_bulk, declaration_for, BuildError, BuildOptions};
    use crate::explode::explode_text;
    use crate::model::{AdcApp, AppType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SSL_CONFIG: &str = "\
add server web01 10.1.1.11
add service svc_web web01 HTTP 80
add ssl certKey web_ck -cert web.crt -key web.key
add ssl certKey root_ca -cert root.crt
add lb vserver secure_app SSL 10.1.1.50 443 -persistenceType COOKIEINSERT
bind lb vserver secure_app svc_web
bind ssl vserver secure_app -certkeyName web_ck
bind ssl vserver secure_app -certkeyName root_ca -CA -ocspCheck Optional
set ssl vserver secure_app -tls13 ENABLED
";

    #[test]
    fn terminating_service_gets_tls_and_certificates() {
        let explosion = explode_text("ns.conf", SSL_CONFIG).expect("explode");
        let app = explosion.find_app("secure_app").expect("app");
        let decl = build(app, &BuildOptions::default()).expect("build");

        let container = &decl.tenant_body["secure_app_ssl443"];
        let service = &container["secure_app_ssl443_vs"];
        assert_eq!(service["class"], "Service_HTTPS");
        assert_eq!(service["serverTLS"], "secure_app_ssl443_tls");
        assert_eq!(service["persistenceMethods"], json!(["cookie"]));
        assert_eq!(
            container["secure_app_ssl443_tls"]["certificates"],
            json!([{ "certificate": "secure_app_ssl443_cert" }])
        );
        assert_eq!(container["secure_app_ssl443_tls"]["tls1_3Enabled"], true);
        assert_eq!(
            container["secure_app_ssl443_cert"]["certificate"]["bigip"],
            "/Common/web.crt"
        );
        assert!(container.get("secure_app_ssl443_cert_2").is_none());
    }

    #[test]
    fn skip_tls_references_default_profile() {
        let explosion = explode_text("ns.conf", SSL_CONFIG).expect("explode");
        let app = explosion.find_app("secure_app").expect("app");
        let opts = BuildOptions {
            skip_tls: true,
            ..BuildOptions::default()
        };
        let decl = build(app, &opts).expect("build");
        let container = &decl.tenant_body["secure_app_ssl443"];
        assert_eq!(
            container["secure_app_ssl443_vs"]["serverTLS"],
            json!({ "bigip": "/Common/clientssl" })
        );
        assert!(container.get("secure_app_ssl443_tls").is_none());
    }

    #[test]
    fn no_members_means_no_pool() {
        let mut app = AdcApp::new("lonely", AppType::LoadBalancer, "TCP");
        app.ip_address = Some("10.0.0.1".to_string());
        app.port = Some("22".to_string());
        let decl = build(&app, &BuildOptions::default()).expect("build");
        let container = &decl.tenant_body["lonely_tcp22"];
        assert!(container.get("lonely_tcp22_pool").is_none());
        assert!(container["lonely_tcp22_vs"].get("pool").is_none());
    }

    #[test]
    fn unknown_protocol_maps_to_generic_service() {
        let mut app = AdcApp::new("diam", AppType::LoadBalancer, "DIAMETER");
        app.port = Some("3868".to_string());
        let decl = build(&app, &BuildOptions::default()).expect("build");
        assert_eq!(
            decl.tenant_body["diam_diameter3868"]["diam_diameter3868_vs"]["class"],
            "Service_Generic"
        );
    }

    #[test]
    fn global_traffic_is_unsupported() {
        let app = AdcApp::new("gslb1", AppType::GlobalTraffic, "HTTP");
        let err = build(&app, &BuildOptions::default()).expect_err("gslb");
        assert!(matches!(err, BuildError::UnsupportedApplicationType { .. }));
    }

    #[test]
    fn missing_name_is_invalid() {
        let app = AdcApp::new("\"\"", AppType::LoadBalancer, "HTTP");
        let err = build(&app, &BuildOptions::default()).expect_err("no name");
        assert!(matches!(err, BuildError::InvalidApplication { .. }));
    }

    #[test]
    fn building_twice_is_identical() {
        let explosion = explode_text("ns.conf", SSL_CONFIG).expect("explode");
        let app = explosion.find_app("secure_app").expect("app");
        let first = build(app, &BuildOptions::default()).expect("build");
        let second = build(app, &BuildOptions::default()).expect("build");
        assert_eq!(
            serde_json::to_string(&first).expect("json"),
            serde_json::to_string(&second).expect("json")
        );
    }

    #[test]
    fn bulk_merges_successes_and_counts_failures() {
        let mut a = AdcApp::new("a", AppType::LoadBalancer, "HTTP");
        a.port = Some("80".to_string());
        let mut b = AdcApp::new("b", AppType::ContentSwitch, "HTTP");
        b.port = Some("80".to_string());
        let g = AdcApp::new("g", AppType::GlobalTraffic, "HTTP");

        let bulk = build_bulk(&[a, g, b], &BuildOptions::default());
        assert_eq!(bulk.succeeded, 2);
        assert_eq!(bulk.failed, 1);
        assert!(bulk.results[1].error.is_some());

        let declaration = bulk.declaration.expect("declaration");
        let adc = declaration["declaration"].as_object().expect("adc object");
        let tenants: Vec<&String> = adc
            .iter()
            .filter(|(_, v)| v["class"] == "Tenant")
            .map(|(k, _)| k)
            .collect();
        assert_eq!(tenants, vec!["t_a", "t_b"]);
        assert_eq!(adc["schemaVersion"], "3.50.0");
    }

    #[test]
    fn bulk_reports_colliding_names_instead_of_dropping_them() {
        let mut dotted = AdcApp::new("web.app", AppType::LoadBalancer, "HTTP");
        dotted.ip_address = Some("10.0.0.1".to_string());
        dotted.port = Some("80".to_string());
        let mut underscored = AdcApp::new("web_app", AppType::LoadBalancer, "HTTP");
        underscored.ip_address = Some("10.0.0.2".to_string());
        underscored.port = Some("80".to_string());

        let bulk = build_bulk(&[dotted, underscored], &BuildOptions::default());
        assert_eq!(bulk.succeeded, 1);
        assert_eq!(bulk.failed, 1);
        assert_eq!(bulk.results[1].tenant, None);
        let error = bulk.results[1].error.as_deref().expect("collision error");
        assert!(error.contains("web_app_http80"), "{error}");
        assert!(error.contains("web.app"), "{error}");

        let declaration = bulk.declaration.expect("declaration");
        assert_eq!(
            declaration["declaration"]["t_web_app"]["web_app_http80"]["web_app_http80_vs"]
                ["virtualAddresses"],
            json!(["10.0.0.1"])
        );
    }

    #[test]
    fn bulk_merges_distinct_applications_into_a_shared_tenant() {
        let mut http = AdcApp::new("web", AppType::LoadBalancer, "HTTP");
        http.port = Some("80".to_string());
        let mut ssl = AdcApp::new("web", AppType::LoadBalancer, "SSL");
        ssl.port = Some("443".to_string());

        let bulk = build_bulk(&[http, ssl], &BuildOptions::default());
        assert_eq!(bulk.succeeded, 2);
        let declaration = bulk.declaration.expect("declaration");
        let tenant = &declaration["declaration"]["t_web"];
        assert_eq!(tenant["web_http80"]["class"], "Application");
        assert_eq!(tenant["web_ssl443"]["class"], "Application");
    }

    #[test]
    fn bulk_with_no_successes_has_no_declaration() {
        let g = AdcApp::new("g", AppType::GlobalTraffic, "HTTP");
        let bulk = build_bulk(&[g], &BuildOptions::default());
        assert_eq!(bulk.succeeded, 0);
        assert!(bulk.declaration.is_none());
    }

    #[test]
    fn single_declaration_wraps_tenant() {
        let mut app = AdcApp::new("a", AppType::LoadBalancer, "HTTP");
        app.port = Some("80".to_string());
        let opts = BuildOptions::default();
        let decl = build(&app, &opts).expect("build");
        let full = declaration_for(&decl, &opts);
        assert_eq!(full["class"], "AS3");
        assert_eq!(full["declaration"]["t_a"]["class"], "Tenant");
    }
}

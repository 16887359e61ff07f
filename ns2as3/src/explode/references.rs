use std::collections::HashMap;

use nsconf_core::tokenize;

use super::LineSet;
use crate::diagnostics::{codes, Diagnostic, Diagnostics};
use crate::model::{AdcApp, AppType};

/// Phase 4: embed detached copies of every load balancer a content switch
/// dispatches to and fold in their non-SSL lines.
///
/// Runs only once every application is fully built; lookups are read-only.
pub(crate) fn resolve(apps: &mut [AdcApp], diags: &mut Diagnostics) {
    let lb_by_name: HashMap<&str, usize> = apps
        .iter()
        .enumerate()
        .filter(|(_, app)| app.app_type == AppType::LoadBalancer)
        .map(|(idx, app)| (app.name.as_str(), idx))
        .collect();

    let mut plans = Vec::new();
    for (idx, cs) in apps.iter().enumerate() {
        if cs.app_type != AppType::ContentSwitch {
            continue;
        }
        let mut copies = Vec::new();
        let mut extra = Vec::new();
        for target in targets(cs) {
            match lb_by_name.get(target) {
                Some(&lb_idx) => {
                    let lb = &apps[lb_idx];
                    copies.push(lb.detached_copy());
                    extra.extend(lb.lines().iter().filter(|l| !is_ssl_line(l)).cloned());
                }
                None => diags.push(Diagnostic::warning(
                    codes::DANGLING_REFERENCE,
                    format!("content switch {} targets unknown lb vserver {target}", cs.name),
                )),
            }
        }
        if !copies.is_empty() {
            plans.push((idx, copies, extra));
        }
    }

    for (idx, copies, extra) in plans {
        let cs = &mut apps[idx];
        log::debug!("{} references {} load balancer(s)", cs.name, copies.len());
        let mut lines = LineSet::from(cs.lines.take().unwrap_or_default());
        for line in &extra {
            lines.push(line);
        }
        cs.lines = Some(lines.into_vec());
        cs.apps = copies;
    }
}

/// Distinct target names in order: direct option, default bind, then policies.
fn targets(cs: &AdcApp) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    let candidates = cs
        .opts
        .get_str("-targetLBVserver")
        .into_iter()
        .chain(cs.bindings.default_lb.as_deref())
        .chain(cs.bindings.policies.iter().filter_map(|p| p.target.as_deref()));
    for name in candidates {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// `bind ssl ...`, `set ssl ...`, `add ssl ...`.
fn is_ssl_line(line: &str) -> bool {
    tokenize(line)
        .ok()
        .and_then(|tokens| tokens.get(1).map(|t| t.text.eq_ignore_ascii_case("ssl")))
        .unwrap_or(false)
}

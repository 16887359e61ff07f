use std::collections::BTreeMap;

use nsconf_core::{Statement, StatementKind};

use crate::detect::VersionDetection;
use crate::model::{AdcApp, PhaseTimings, Stats};

pub(crate) fn compute(
    statements: &[Statement],
    parse_errors: usize,
    apps: &[AdcApp],
    version: &VersionDetection,
    timings: PhaseTimings,
) -> Stats {
    let mut apps_by_type = BTreeMap::new();
    for app in apps {
        *apps_by_type.entry(app.app_type.to_string()).or_insert(0) += 1;
    }

    Stats {
        statements: statements.len(),
        pass_through: statements
            .iter()
            .filter(|s| s.kind == StatementKind::PassThrough)
            .count(),
        parse_errors,
        apps: apps.len(),
        apps_by_type,
        source_version: version.value.clone(),
        version_assumed: version.assumed,
        timings,
    }
}

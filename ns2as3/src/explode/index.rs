use std::collections::HashMap;

use nsconf_core::{Statement, Verb};

use crate::model::AppType;

/// Read-only lookup tables over one run's statements.
///
/// Names are keyed exactly as written, quotes included.
#[derive(Debug, Default)]
pub(crate) struct ConfigIndex<'a> {
    /// Application definitions in source order.
    pub vservers: Vec<(AppType, &'a Statement)>,
    pub servers: HashMap<&'a str, &'a Statement>,
    pub services: HashMap<&'a str, &'a Statement>,
    pub service_groups: HashMap<&'a str, &'a Statement>,
    pub monitors: HashMap<&'a str, &'a Statement>,
    pub certkeys: HashMap<&'a str, &'a Statement>,
    /// `add <feature> policy` for every policy-bearing feature.
    pub policies: HashMap<&'a str, &'a Statement>,
    /// `add <feature> action` for every action-bearing feature.
    pub actions: HashMap<&'a str, &'a Statement>,
    pub group_binds: HashMap<&'a str, Vec<&'a Statement>>,
    pub service_binds: HashMap<&'a str, Vec<&'a Statement>>,
    pub vserver_binds: HashMap<AppType, HashMap<&'a str, Vec<&'a Statement>>>,
    pub vserver_sets: HashMap<AppType, HashMap<&'a str, Vec<&'a Statement>>>,
    pub ssl_binds: HashMap<&'a str, Vec<&'a Statement>>,
    pub ssl_sets: HashMap<&'a str, Vec<&'a Statement>>,
    /// `enable|disable server|service <name>` in source order.
    pub state_toggles: HashMap<&'a str, Vec<&'a Statement>>,
}

impl<'a> ConfigIndex<'a> {
    pub fn build(statements: &'a [Statement]) -> Self {
        let mut index = ConfigIndex::default();

        for stmt in statements {
            let (Some(verb), Some(object_type), Some(name)) =
                (stmt.verb(), stmt.object_type(), stmt.name())
            else {
                continue;
            };

            match verb {
                Verb::Add => index.add(object_type, name, stmt),
                Verb::Bind => index.bind(object_type, name, stmt),
                Verb::Set => index.set(object_type, name, stmt),
                Verb::Enable | Verb::Disable
                    if object_type == "server" || object_type == "service" =>
                {
                    index.state_toggles.entry(name).or_default().push(stmt);
                }
                _ => {}
            }
        }

        index
    }

    fn add(&mut self, object_type: &'a str, name: &'a str, stmt: &'a Statement) {
        if let Some(app_type) = AppType::from_object_type(object_type) {
            self.vservers.push((app_type, stmt));
            return;
        }
        let table = match object_type {
            "server" => &mut self.servers,
            "service" => &mut self.services,
            "serviceGroup" => &mut self.service_groups,
            "lb monitor" => &mut self.monitors,
            "ssl certKey" => &mut self.certkeys,
            other if other.ends_with(" policy") => &mut self.policies,
            other if other.ends_with(" action") => &mut self.actions,
            _ => return,
        };
        table.entry(name).or_insert(stmt);
    }

    fn bind(&mut self, object_type: &'a str, name: &'a str, stmt: &'a Statement) {
        if let Some(app_type) = AppType::from_object_type(object_type) {
            self.vserver_binds
                .entry(app_type)
                .or_default()
                .entry(name)
                .or_default()
                .push(stmt);
            return;
        }
        let table = match object_type {
            "serviceGroup" => &mut self.group_binds,
            "service" => &mut self.service_binds,
            "ssl vserver" => &mut self.ssl_binds,
            _ => return,
        };
        table.entry(name).or_default().push(stmt);
    }

    fn set(&mut self, object_type: &'a str, name: &'a str, stmt: &'a Statement) {
        if let Some(app_type) = AppType::from_object_type(object_type) {
            self.vserver_sets
                .entry(app_type)
                .or_default()
                .entry(name)
                .or_default()
                .push(stmt);
        } else if object_type == "ssl vserver" {
            self.ssl_sets.entry(name).or_default().push(stmt);
        }
    }

    pub fn binds_for(&self, app_type: AppType, name: &str) -> &[&'a Statement] {
        self.vserver_binds
            .get(&app_type)
            .and_then(|by_name| by_name.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn sets_for(&self, app_type: AppType, name: &str) -> &[&'a Statement] {
        self.vserver_sets
            .get(&app_type)
            .and_then(|by_name| by_name.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn ssl_binds_for(&self, name: &str) -> &[&'a Statement] {
        self.ssl_binds.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ssl_sets_for(&self, name: &str) -> &[&'a Statement] {
        self.ssl_sets.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group_binds_for(&self, name: &str) -> &[&'a Statement] {
        self.group_binds.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn service_binds_for(&self, name: &str) -> &[&'a Statement] {
        self.service_binds.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Enabled state after applying `-state` and later enable/disable toggles.
    pub fn is_enabled(&self, stmt: &Statement) -> bool {
        let mut enabled = !stmt
            .opts
            .get_str("-state")
            .is_some_and(|s| s.eq_ignore_ascii_case("DISABLED"));
        if let Some(name) = stmt.name() {
            for toggle in self.state_toggles.get(name).into_iter().flatten() {
                if toggle.object_type() == stmt.object_type() {
                    enabled = toggle.verb() == Some(&Verb::Enable);
                }
            }
        }
        enabled
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigIndex;
    use crate::model::AppType;
    use nsconf_core::parse_config;

    #[test]
    fn groups_statements_by_subject() {
        let parsed = parse_config(
            "add server s1 10.0.0.1\n\
             add serviceGroup sg1 HTTP\n\
             bind serviceGroup sg1 s1 80\n\
             bind serviceGroup sg1 -monitorName http\n\
             add lb vserver lb1 HTTP 10.0.0.10 80\n\
             bind lb vserver lb1 sg1\n\
             add responder policy rp1 true DROP\n",
            "ns.conf",
        );
        let index = ConfigIndex::build(&parsed.statements);

        assert_eq!(index.vservers.len(), 1);
        assert!(index.servers.contains_key("s1"));
        assert_eq!(index.group_binds_for("sg1").len(), 2);
        assert_eq!(index.binds_for(AppType::LoadBalancer, "lb1").len(), 1);
        assert!(index.binds_for(AppType::ContentSwitch, "lb1").is_empty());
        assert!(index.policies.contains_key("rp1"));
    }

    #[test]
    fn vserver_lookups_take_names_owned_elsewhere() {
        let parsed = parse_config(
            "add lb vserver lb1 HTTP 10.0.0.10 80\n\
             set lb vserver lb1 -cltTimeout 30\n\
             bind lb vserver lb1 svc1\n",
            "ns.conf",
        );
        let index = ConfigIndex::build(&parsed.statements);

        let owned = String::from("lb1");
        assert_eq!(index.binds_for(AppType::LoadBalancer, &owned).len(), 1);
        assert_eq!(index.sets_for(AppType::LoadBalancer, &owned).len(), 1);
        drop(owned);
        assert!(index.sets_for(AppType::ContentSwitch, "lb1").is_empty());
    }

    #[test]
    fn later_toggle_wins_over_state_flag() {
        let parsed = parse_config(
            "add server s1 10.0.0.1 -state DISABLED\n\
             enable server s1\n\
             add server s2 10.0.0.2\n\
             disable server s2\n",
            "ns.conf",
        );
        let index = ConfigIndex::build(&parsed.statements);
        assert!(index.is_enabled(index.servers["s1"]));
        assert!(!index.is_enabled(index.servers["s2"]));
    }
}

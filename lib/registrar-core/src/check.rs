//! Health check selection for registry entries
//!
//! A service carries at most one health check, picked from its attributes by
//! a fixed precedence: `check_http`, `check_cmd`, `check_script`, `check_ttl`.
//! The first attribute with a non-empty value wins and later ones are ignored.

use crate::Service;

/// Interval applied to polled checks when `check_interval` is not set
pub const DEFAULT_INTERVAL: &str = "10s";

/// Number of container ID characters passed to `check-cmd`
const SHORT_CONTAINER_ID_LEN: usize = 12;

/// Health check attached to a registry entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HealthCheck {
    /// HTTP GET against the service address
    Http {
        url: String,
        timeout: Option<String>,
        interval: String,
    },
    /// `check-cmd` helper run against the service's container
    Command { script: String, interval: String },
    /// Operator-supplied script with `$SERVICE_IP`/`$SERVICE_PORT` expanded
    Script { script: String, interval: String },
    /// Heartbeat the service must push before the TTL expires
    Ttl { ttl: String },
}

impl HealthCheck {
    /// Polling interval, if this check is polled by the backend.
    pub fn interval(&self) -> Option<&str> {
        match self {
            HealthCheck::Http { interval, .. }
            | HealthCheck::Command { interval, .. }
            | HealthCheck::Script { interval, .. } => Some(interval),
            HealthCheck::Ttl { .. } => None,
        }
    }
}

/// Builds a check from a service and the non-empty value of the matched attribute
pub type CheckFn = fn(&Service, &str) -> HealthCheck;

/// Check rules in precedence order
pub const CHECK_RULES: &[(&str, CheckFn)] = &[
    ("check_http", http_check),
    ("check_cmd", command_check),
    ("check_script", script_check),
    ("check_ttl", ttl_check),
];

/// Name of the attribute whose rule applies to a service.
pub fn matched_rule(service: &Service) -> Option<&'static str> {
    CHECK_RULES
        .iter()
        .map(|(attr, _)| *attr)
        .find(|attr| service.attr(attr).is_some())
}

/// Build the health check for a service, or `None` if no check attribute is set.
pub fn build_check(service: &Service) -> Option<HealthCheck> {
    CHECK_RULES.iter().find_map(|(attr, build)| {
        service.attr(attr).map(|value| build(service, value))
    })
}

fn interval(service: &Service) -> String {
    service
        .attr("check_interval")
        .unwrap_or(DEFAULT_INTERVAL)
        .to_string()
}

fn http_check(service: &Service, path: &str) -> HealthCheck {
    HealthCheck::Http {
        url: format!("http://{}:{}{}", service.ip, service.port, path),
        timeout: service.attr("check_timeout").map(str::to_string),
        interval: interval(service),
    }
}

fn command_check(service: &Service, cmd: &str) -> HealthCheck {
    let container_id: String = service
        .origin
        .container_id
        .chars()
        .take(SHORT_CONTAINER_ID_LEN)
        .collect();

    HealthCheck::Command {
        script: format!(
            "check-cmd {} {} {}",
            container_id, service.origin.exposed_port, cmd
        ),
        interval: interval(service),
    }
}

fn script_check(service: &Service, script: &str) -> HealthCheck {
    HealthCheck::Script {
        script: interpolate(script, service),
        interval: interval(service),
    }
}

fn ttl_check(_service: &Service, ttl: &str) -> HealthCheck {
    HealthCheck::Ttl {
        ttl: ttl.to_string(),
    }
}

/// Expand every `$SERVICE_IP` and `$SERVICE_PORT` with the origin's host address.
pub fn interpolate(script: &str, service: &Service) -> String {
    script
        .replace("$SERVICE_IP", &service.origin.host_ip)
        .replace("$SERVICE_PORT", &service.origin.host_port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceOrigin;

    fn service(attrs: &[(&str, &str)]) -> Service {
        Service {
            name: "web".to_string(),
            id: "web-1".to_string(),
            ip: "192.168.1.10".to_string(),
            port: 8080,
            tags: vec![],
            origin: ServiceOrigin {
                container_id: "abcdef0123456789".to_string(),
                host_ip: "10.0.0.5".to_string(),
                host_port: "8080".to_string(),
                exposed_port: "80".to_string(),
            },
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_no_check_attributes() {
        assert_eq!(build_check(&service(&[])), None);
        assert_eq!(build_check(&service(&[("owner", "team-a")])), None);
        assert_eq!(build_check(&service(&[("check_interval", "5s")])), None);
    }

    #[test]
    fn test_empty_check_attributes_are_ignored() {
        let svc = service(&[("check_http", ""), ("check_ttl", "")]);
        assert_eq!(build_check(&svc), None);

        let svc = service(&[("check_http", ""), ("check_ttl", "15s")]);
        assert_eq!(
            build_check(&svc),
            Some(HealthCheck::Ttl { ttl: "15s".to_string() })
        );
    }

    #[test]
    fn test_http_takes_precedence_over_ttl() {
        let svc = service(&[("check_http", "/health"), ("check_ttl", "30s")]);
        assert!(matches!(build_check(&svc), Some(HealthCheck::Http { .. })));
    }

    #[test]
    fn test_rule_order() {
        let attrs: Vec<&str> = CHECK_RULES.iter().map(|(attr, _)| *attr).collect();
        assert_eq!(attrs, ["check_http", "check_cmd", "check_script", "check_ttl"]);
    }

    #[test]
    fn test_cmd_takes_precedence_over_script() {
        let svc = service(&[("check_cmd", "ping"), ("check_script", "true")]);
        assert!(matches!(build_check(&svc), Some(HealthCheck::Command { .. })));
        assert_eq!(matched_rule(&svc), Some("check_cmd"));
        assert_eq!(matched_rule(&service(&[])), None);
    }

    #[test]
    fn test_http_check() {
        let svc = service(&[("check_http", "/health"), ("check_timeout", "3s")]);
        assert_eq!(
            build_check(&svc),
            Some(HealthCheck::Http {
                url: "http://192.168.1.10:8080/health".to_string(),
                timeout: Some("3s".to_string()),
                interval: DEFAULT_INTERVAL.to_string(),
            })
        );
    }

    #[test]
    fn test_interval_default_and_override() {
        let check = build_check(&service(&[("check_http", "/health")])).unwrap();
        assert_eq!(check.interval(), Some("10s"));

        let check = build_check(&service(&[
            ("check_http", "/health"),
            ("check_interval", "5s"),
        ]))
        .unwrap();
        assert_eq!(check.interval(), Some("5s"));
    }

    #[test]
    fn test_ttl_has_no_interval() {
        let check = build_check(&service(&[("check_ttl", "30s"), ("check_interval", "5s")]))
            .unwrap();
        assert_eq!(check, HealthCheck::Ttl { ttl: "30s".to_string() });
        assert_eq!(check.interval(), None);
    }

    #[test]
    fn test_command_check() {
        let check = build_check(&service(&[("check_cmd", "ping")])).unwrap();
        assert_eq!(
            check,
            HealthCheck::Command {
                script: "check-cmd abcdef012345 80 ping".to_string(),
                interval: "10s".to_string(),
            }
        );
    }

    #[test]
    fn test_command_check_short_container_id() {
        let mut svc = service(&[("check_cmd", "ping")]);
        svc.origin.container_id = "abc".to_string();
        assert!(matches!(
            build_check(&svc),
            Some(HealthCheck::Command { script, .. }) if script == "check-cmd abc 80 ping"
        ));
    }

    #[test]
    fn test_script_interpolation() {
        let svc = service(&[("check_script", "curl $SERVICE_IP:$SERVICE_PORT/health")]);
        assert!(matches!(
            build_check(&svc),
            Some(HealthCheck::Script { script, .. }) if script == "curl 10.0.0.5:8080/health"
        ));
    }

    #[test]
    fn test_interpolation_replaces_every_occurrence() {
        let svc = service(&[]);
        assert_eq!(
            interpolate("$SERVICE_IP $SERVICE_IP:$SERVICE_PORT $SERVICE_PORT", &svc),
            "10.0.0.5 10.0.0.5:8080 8080"
        );
    }
}

//! Kubernetes resource quantity parsing.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use regex::Regex;
use std::sync::OnceLock;

fn quantity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+))(?:([eE][+-]?\d+)|(Ki|Mi|Gi|Ti|Pi|Ei|n|u|m|k|M|G|T|P|E))?$")
            .expect("valid quantity regex")
    })
}

/// Parse a quantity string into its value in base units (cores, bytes).
pub fn parse_quantity(s: &str) -> Option<f64> {
    let caps = quantity_regex().captures(s.trim())?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;

    if let Some(exp) = caps.get(2) {
        let exp: i32 = exp.as_str()[1..].parse().ok()?;
        return Some(number * 10f64.powi(exp));
    }

    let multiplier = match caps.get(3).map(|m| m.as_str()) {
        None => 1.0,
        Some("n") => 1e-9,
        Some("u") => 1e-6,
        Some("m") => 1e-3,
        Some("k") => 1e3,
        Some("M") => 1e6,
        Some("G") => 1e9,
        Some("T") => 1e12,
        Some("P") => 1e15,
        Some("E") => 1e18,
        Some("Ki") => 1024.0,
        Some("Mi") => 1024f64.powi(2),
        Some("Gi") => 1024f64.powi(3),
        Some("Ti") => 1024f64.powi(4),
        Some("Pi") => 1024f64.powi(5),
        Some("Ei") => 1024f64.powi(6),
        Some(_) => return None,
    };
    Some(number * multiplier)
}

/// CPU quantity in millicores.
pub fn cpu_millicores(q: &Quantity) -> Option<i64> {
    parse_quantity(&q.0).map(|cores| (cores * 1000.0).round() as i64)
}

/// Memory or storage quantity in bytes.
pub fn bytes(q: &Quantity) -> Option<i64> {
    parse_quantity(&q.0).map(|b| b.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        Quantity(s.to_string())
    }

    #[test]
    fn test_cpu_quantities() {
        assert_eq!(cpu_millicores(&q("250m")), Some(250));
        assert_eq!(cpu_millicores(&q("1.5")), Some(1500));
        assert_eq!(cpu_millicores(&q("2")), Some(2000));
        assert_eq!(cpu_millicores(&q("12345678n")), Some(12));
        assert_eq!(cpu_millicores(&q("500u")), Some(1));
    }

    #[test]
    fn test_memory_quantities() {
        assert_eq!(bytes(&q("128Mi")), Some(134_217_728));
        assert_eq!(bytes(&q("1G")), Some(1_000_000_000));
        assert_eq!(bytes(&q("10Gi")), Some(10_737_418_240));
        assert_eq!(bytes(&q("1e3")), Some(1000));
        assert_eq!(bytes(&q("4096")), Some(4096));
        assert_eq!(bytes(&q("2E")), Some(2_000_000_000_000_000_000));
    }

    #[test]
    fn test_invalid_quantity() {
        assert_eq!(parse_quantity("lots"), None);
        assert_eq!(parse_quantity("12Qi"), None);
        assert_eq!(parse_quantity(""), None);
    }
}

//! Validation de l'en-tête Host des requêtes entrantes.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Valide un en-tête `Host` contre l'adresse et le port liés.
///
/// Formes acceptées : `IPv4[:port]` et `[IPv6][:port]`. Les noms d'hôtes sont
/// refusés, de même que les IPv6 sans crochets et les zone-ids (`%`). Un port
/// absent vaut 80. L'adresse et le port doivent correspondre, après
/// normalisation des adresses.
pub fn validate_host_header(header: &str, bound_ip: &IpAddr, bound_port: u16) -> bool {
    match parse_host_header(header) {
        Some((ip, port)) => ip == *bound_ip && port == bound_port,
        None => false,
    }
}

/// Parse un en-tête `Host` en adresse littérale et port (80 par défaut).
///
/// Retourne `None` pour un nom d'hôte, une IPv6 sans crochets ou un zone-id.
pub fn parse_host_header(header: &str) -> Option<(IpAddr, u16)> {
    let header = header.trim();

    if let Some(rest) = header.strip_prefix('[') {
        // Forme [IPv6][:port]
        let end = rest.find(']')?;
        let host = &rest[..end];
        if host.contains('%') {
            return None;
        }
        let ip = host.parse::<Ipv6Addr>().ok()?;

        let remainder = &rest[end + 1..];
        let port = if remainder.is_empty() {
            80
        } else {
            remainder.strip_prefix(':')?.parse::<u16>().ok()?
        };
        Some((IpAddr::V6(ip), port))
    } else {
        // Forme IPv4[:port] ; plusieurs ':' trahissent une IPv6 sans crochets
        if header.matches(':').count() > 1 {
            return None;
        }
        let (host, port) = match header.split_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().ok()?),
            None => (header, 80),
        };
        let ip = host.parse::<Ipv4Addr>().ok()?;
        Some((IpAddr::V4(ip), port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    fn v6() -> IpAddr {
        "::1".parse().unwrap()
    }

    #[test]
    fn test_ipv4_accepted() {
        assert!(validate_host_header("127.0.0.1:4711", &v4(), 4711));
        assert!(validate_host_header("127.0.0.1", &v4(), 80));
    }

    #[test]
    fn test_names_rejected() {
        assert!(!validate_host_header("example.com", &v4(), 4711));
        assert!(!validate_host_header("example.com:80", &v4(), 4711));
        assert!(!validate_host_header("example.com:4711", &v4(), 4711));
    }

    #[test]
    fn test_wrong_ip_or_port_rejected() {
        assert!(!validate_host_header("192.168.1.2:4711", &v4(), 4711));
        assert!(!validate_host_header("127.0.0.1:4712", &v4(), 4711));
        assert!(!validate_host_header("[fe80::01]", &v4(), 4711));
    }

    #[test]
    fn test_ipv6_forms() {
        assert!(validate_host_header("[::1]:4711", &v6(), 4711));
        assert!(validate_host_header("[::1]", &v6(), 80));
        // IPv6 sans crochets refusée, même correcte
        assert!(!validate_host_header("::1", &v6(), 80));
        assert!(!validate_host_header("example.com:4711", &v6(), 4711));
    }

    #[test]
    fn test_zone_ids_always_rejected() {
        assert!(!validate_host_header("[fe80::01%1]", &v4(), 4711));
        assert!(!validate_host_header("[fe80::01%eth0]", &v4(), 4711));
        let fe80: IpAddr = "fe80::1".parse().unwrap();
        assert!(!validate_host_header("[fe80::01%eth0]", &fe80, 4711));
    }

    #[test]
    fn test_normalized_comparison() {
        let fe80: IpAddr = "fe80::1".parse().unwrap();
        // fe80::01 et fe80::1 sont la même adresse
        assert!(validate_host_header("[fe80::01]:4711", &fe80, 4711));
    }
}

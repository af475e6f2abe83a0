/// Distinguished name reduced to a form that can be compared: RDNs in order,
/// lowercased, without spaces around separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Dn(Vec<String>);

impl Dn {
    pub(super) fn parse(dn: &str) -> Self {
        let mut rdns = vec![];
        let mut rdn = String::new();
        let mut escaped = false;
        for c in dn.chars() {
            match c {
                _ if escaped => {
                    rdn.push(c);
                    escaped = false;
                }
                '\\' => {
                    rdn.push(c);
                    escaped = true;
                }
                ',' => rdns.push(Self::normalize_rdn(&std::mem::take(&mut rdn))),
                _ => rdn.push(c),
            }
        }
        if !rdn.trim().is_empty() || !rdns.is_empty() {
            rdns.push(Self::normalize_rdn(&rdn));
        }
        Self(rdns)
    }

    fn normalize_rdn(rdn: &str) -> String {
        match rdn.split_once('=') {
            Some((attr, value)) => format!(
                "{}={}",
                attr.trim().to_lowercase(),
                value.trim().to_lowercase()
            ),
            None => rdn.trim().to_lowercase(),
        }
    }

    /// True when `self` is `base` or lies anywhere below it.
    pub(super) fn is_within(&self, base: &Dn) -> bool {
        self.0.ends_with(&base.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(
            Dn::parse("CN=Persistent , cn = KCM"),
            Dn::parse("cn=persistent,cn=kcm")
        );
    }

    #[test]
    fn test_is_within() {
        let base = Dn::parse("cn=kcm");
        let container = Dn::parse("cn=1000,cn=persistent,cn=kcm");
        let secret = Dn::parse("cn=abc-0,cn=1000,cn=persistent,cn=kcm");
        assert!(base.is_within(&base));
        assert!(container.is_within(&base));
        assert!(secret.is_within(&container));
        assert!(!container.is_within(&secret));
        assert!(!Dn::parse("cn=kcm2").is_within(&base));
        assert!(!Dn::parse("cn=x,cn=secrets").is_within(&base));
    }

    #[test]
    fn test_escaped_comma_stays_in_rdn() {
        let dn = Dn::parse("cn=a\\,b,cn=kcm");
        assert!(dn.is_within(&Dn::parse("cn=kcm")));
        assert!(!dn.is_within(&Dn::parse("cn=b,cn=kcm")));
    }

    #[test]
    fn test_empty_dn_is_root() {
        let root = Dn::parse("");
        assert!(Dn::parse("cn=kcm").is_within(&root));
    }
}

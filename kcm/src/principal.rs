use std::fmt;

const REALM_SEP: char = '@';
const COMPONENT_SEP: char = '/';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub realm: String,
    pub components: Vec<String>,
    pub name_type: NameType,
}

impl Principal {
    /// Renders `comp1/comp2@REALM`. A principal without components renders as
    /// `@REALM`.
    pub fn unparse_name(&self) -> String {
        let mut name = self.components.join(&COMPONENT_SEP.to_string());
        name.push(REALM_SEP);
        name.push_str(&self.realm);
        name
    }

    pub fn first_component(&self) -> Option<&str> {
        self.components.first().map(String::as_str)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unparse_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameType(pub u32);

macro_rules! name_type {
    ($name_type:ident, $int:expr) => {
        pub const $name_type: NameType = NameType($int);
    };
}

impl NameType {
    // Name type not known
    name_type!(UNKNOWN, 0);
    // Just the name of the principal as in DCE, or for users
    name_type!(PRINCIPAL, 1);
    // Service and other unique instance (krbtgt)
    name_type!(SRV_INST, 2);
    // Service with host name as instance (telnet, rcommands)
    name_type!(SRV_HST, 3);
    // Service with host as remaining components
    name_type!(SRV_XHST, 4);
    // Unique ID
    name_type!(UID, 5);
    // PKINIT
    name_type!(X500_PRINCIPAL, 6);
    // Name in form of SMTP email name
    name_type!(SMTP_NAME, 7);
    // Windows 2000 UPN
    name_type!(ENTERPRISE_PRINCIPAL, 10);
    // Well-known (special) principal
    name_type!(WELLKNOWN, 11);
}

impl fmt::Display for NameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::UNKNOWN => "UNKNOWN",
            Self::PRINCIPAL => "PRINCIPAL",
            Self::SRV_INST => "SRV_INST",
            Self::SRV_HST => "SRV_HST",
            Self::SRV_XHST => "SRV_XHST",
            Self::UID => "UID",
            Self::X500_PRINCIPAL => "X500_PRINCIPAL",
            Self::SMTP_NAME => "SMTP_NAME",
            Self::ENTERPRISE_PRINCIPAL => "ENTERPRISE_PRINCIPAL",
            Self::WELLKNOWN => "WELLKNOWN",
            NameType(other) => return write!(f, "{}", other),
        };
        write!(f, "{}", name)
    }
}

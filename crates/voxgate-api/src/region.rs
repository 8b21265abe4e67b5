//! Regional cloud selection.
//!
//! SmartPlus accounts are homed on one of a handful of regional clusters,
//! each reachable under its own subdomain of `akuvox.com`. The mobile app
//! derives the cluster from the user's country calling code; we reproduce
//! that table here so sign-in lands on the right cluster without a probe.

use tracing::warn;

/// Baseline cluster used when no region can be determined.
///
/// Installations configured before subdomains were persisted all talked to
/// this cluster, so it doubles as the compatibility default.
pub const DEFAULT_SUBDOMAIN: &str = "ecloud";

/// One of the fixed regional SmartPlus clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CloudRegion {
    /// Europe and Africa, the baseline cluster.
    Europe,
    /// United States, Canada.
    NorthAmerica,
    /// Central and South America.
    SouthAmerica,
    /// Southeast and East Asia.
    AsiaPacific,
    /// Japan (dedicated cluster).
    Japan,
    /// Australia, New Zealand.
    Oceania,
    /// Middle East.
    MiddleEast,
}

impl CloudRegion {
    /// The `akuvox.com` subdomain label for this region's cluster.
    pub fn subdomain(self) -> &'static str {
        match self {
            Self::Europe => "ecloud",
            Self::NorthAmerica => "ucloud",
            Self::SouthAmerica => "sacloud",
            Self::AsiaPacific => "scloud",
            Self::Japan => "jcloud",
            Self::Oceania => "aucloud",
            Self::MiddleEast => "mecloud",
        }
    }

    /// Region for a numeric country calling code, if the country is in the
    /// supported table. A leading `+` and surrounding whitespace are
    /// ignored.
    pub fn for_calling_code(code: &str) -> Option<Self> {
        let region = match code.trim().trim_start_matches('+') {
            // North America
            "1" => Self::NorthAmerica,
            // Central / South America
            "52" | "54" | "55" | "56" | "57" => Self::SouthAmerica,
            // Europe + Africa
            "20" | "27" | "30" | "31" | "32" | "33" | "34" | "36" | "39" | "40" | "41" | "43"
            | "44" | "45" | "46" | "47" | "48" | "49" | "351" | "352" | "353" | "358" | "370"
            | "371" | "372" | "380" | "420" | "421" => Self::Europe,
            // Middle East
            "90" | "966" | "971" | "972" | "973" | "974" => Self::MiddleEast,
            // Asia Pacific
            "60" | "62" | "63" | "65" | "66" | "82" | "84" | "86" | "852" | "853" | "886"
            | "91" => Self::AsiaPacific,
            // Japan
            "81" => Self::Japan,
            // Oceania
            "61" | "64" => Self::Oceania,
            _ => return None,
        };
        Some(region)
    }
}

/// Resolve the cluster subdomain for a country calling code.
///
/// Unknown or empty codes fall back to [`DEFAULT_SUBDOMAIN`] with a
/// compatibility warning; accounts predating regional clusters live there.
pub fn subdomain_for_calling_code(code: &str) -> &'static str {
    match CloudRegion::for_calling_code(code) {
        Some(region) => region.subdomain(),
        None => {
            warn!(
                country_code = %code,
                "no regional cluster mapped for country code, using '{DEFAULT_SUBDOMAIN}'"
            );
            DEFAULT_SUBDOMAIN
        }
    }
}

/// All calling codes the cloud supports, for sign-in form population.
pub fn supported_calling_codes() -> Vec<&'static str> {
    const CODES: &[&str] = &[
        "1", "20", "27", "30", "31", "32", "33", "34", "36", "39", "40", "41", "43", "44", "45",
        "46", "47", "48", "49", "52", "54", "55", "56", "57", "60", "61", "62", "63", "64", "65",
        "66", "81", "82", "84", "86", "90", "91", "351", "352", "353", "358", "370", "371", "372",
        "380", "420", "421", "852", "853", "886", "966", "971", "972", "973", "974",
    ];
    CODES.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_codes_to_regions() {
        assert_eq!(CloudRegion::for_calling_code("44"), Some(CloudRegion::Europe));
        assert_eq!(CloudRegion::for_calling_code("1"), Some(CloudRegion::NorthAmerica));
        assert_eq!(CloudRegion::for_calling_code("+81"), Some(CloudRegion::Japan));
        assert_eq!(subdomain_for_calling_code("61"), "aucloud");
        assert_eq!(subdomain_for_calling_code("+81"), "jcloud");
    }

    #[test]
    fn unknown_code_falls_back_to_default() {
        assert_eq!(subdomain_for_calling_code("999"), DEFAULT_SUBDOMAIN);
        assert_eq!(subdomain_for_calling_code(""), DEFAULT_SUBDOMAIN);
    }

    #[test]
    fn every_supported_code_resolves() {
        for code in supported_calling_codes() {
            assert!(CloudRegion::for_calling_code(code).is_some(), "unmapped: {code}");
        }
    }
}

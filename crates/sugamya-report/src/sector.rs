//! Sector detection and per-sector regulatory guidance.

use serde::Serialize;
use std::fmt;

/// Business sector of the scanned site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sector {
    /// Central, state and local government
    Government,
    /// Banking, financial services and insurance
    #[serde(rename = "BFSI")]
    Bfsi,
    /// Schools, colleges and universities
    Education,
    /// Hospitals, clinics and health services
    Healthcare,
    /// Online retail
    #[serde(rename = "E-commerce")]
    ECommerce,
    /// Anything else
    General,
}

/// Keyword lists in detection priority order.
const SECTOR_KEYWORDS: [(Sector, &[&str]); 5] = [
    (
        Sector::Government,
        &[".gov", "gov.in", ".nic.in", "government", "ministry", "sarkar", "municipal"],
    ),
    (
        Sector::Bfsi,
        &["bank", "finance", "insurance", "invest", "loan", "credit", "mutualfund", "securities"],
    ),
    (
        Sector::Education,
        &[".edu", ".ac.in", "university", "college", "school", "academy", "institute", "vidyalaya"],
    ),
    (
        Sector::Healthcare,
        &["health", "hospital", "clinic", "medical", "pharma", "medicine", "diagnostic"],
    ),
    (
        Sector::ECommerce,
        &["shop", "store", "cart", "mart", "bazaar", "buy", "deals", "retail"],
    ),
];

/// Classify a site by keyword match on its hostname (or the whole URL when
/// it does not parse). The first matching sector wins.
#[must_use]
pub fn detect_sector(site_url: &str) -> Sector {
    let haystack = url::Url::parse(site_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| site_url.to_ascii_lowercase());

    SECTOR_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map_or(Sector::General, |(sector, _)| *sector)
}

/// Regulation and requirement text attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorGuidance {
    /// Applicable regulations
    pub regulations: &'static [&'static str],
    /// Concrete requirements
    pub requirements: &'static [&'static str],
}

impl Sector {
    /// Display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Government => "Government",
            Self::Bfsi => "BFSI",
            Self::Education => "Education",
            Self::Healthcare => "Healthcare",
            Self::ECommerce => "E-commerce",
            Self::General => "General",
        }
    }

    /// Static guidance block for the sector.
    #[must_use]
    pub fn guidance(self) -> SectorGuidance {
        match self {
            Self::Government => SectorGuidance {
                regulations: &[
                    "Guidelines for Indian Government Websites (GIGW) 3.0",
                    "Rights of Persons with Disabilities Act 2016, Section 46",
                    "IS 17802 (Parts 1 and 2)",
                ],
                requirements: &[
                    "WCAG 2.1 Level AA conformance for all public-facing pages",
                    "Accessibility statement with a named nodal officer",
                    "Bilingual content with declared page language",
                ],
            },
            Self::Bfsi => SectorGuidance {
                regulations: &[
                    "RBI Master Direction on Digital Payment Security Controls",
                    "RBI circular on accessibility of banking facilities for persons with disabilities",
                    "Rights of Persons with Disabilities Act 2016",
                ],
                requirements: &[
                    "Accessible login, OTP and transaction flows",
                    "Screen-reader compatible statements and forms",
                    "Time-outs that can be extended by the user",
                ],
            },
            Self::Education => SectorGuidance {
                regulations: &[
                    "UGC guidelines on accessibility in higher education institutions",
                    "Rights of Persons with Disabilities Act 2016, Sections 16 and 17",
                ],
                requirements: &[
                    "Accessible admissions and examination portals",
                    "Captioned or transcribed lecture media",
                    "Structured, navigable course documents",
                ],
            },
            Self::Healthcare => SectorGuidance {
                regulations: &[
                    "Rights of Persons with Disabilities Act 2016, Section 25",
                    "Ayushman Bharat Digital Mission accessibility expectations",
                ],
                requirements: &[
                    "Accessible appointment booking and report download",
                    "Clear language for medical instructions",
                    "Keyboard-operable teleconsultation controls",
                ],
            },
            Self::ECommerce => SectorGuidance {
                regulations: &[
                    "Consumer Protection (E-Commerce) Rules 2020",
                    "Rights of Persons with Disabilities Act 2016, Section 40",
                ],
                requirements: &[
                    "Accessible product search, cart and checkout",
                    "Text alternatives for product images",
                    "Error identification in payment forms",
                ],
            },
            Self::General => SectorGuidance {
                regulations: &[
                    "Rights of Persons with Disabilities Act 2016",
                    "WCAG 2.1 as referenced by IS 17802",
                ],
                requirements: &[
                    "WCAG 2.1 Level AA as a baseline",
                    "Periodic audits with assistive-technology testing",
                ],
            },
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::validation::null_as_default;

fn default_method() -> String {
    "GET".to_string()
}

fn default_expected_status() -> u16 {
    200
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTestConfig {
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<JsonValue>,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    #[serde(default)]
    pub expected_response: Option<JsonValue>,
}

impl ApiTestConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
            expected_status: default_expected_status(),
            expected_response: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiValidation {
    #[serde(default)]
    pub status_match: bool,
    #[serde(default)]
    pub response_match: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiTestResult {
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Milliseconds.
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub response_body: Option<JsonValue>,
    #[serde(default)]
    pub validation: Option<ApiValidation>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiTestResult {
    pub fn passed(&self) -> bool {
        match self.validation {
            Some(validation) => validation.status_match && validation.response_match,
            None => self.error.is_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub difference_percentage: Option<f64>,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub baseline_url: Option<String>,
    #[serde(default)]
    pub diff_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualTestResult {
    #[serde(default)]
    pub result: VisualOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_throttling: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<u32>,
}

/// Timings in milliseconds, memory in megabytes, CPU in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(default)]
    pub page_load_time: f64,
    #[serde(default)]
    pub first_contentful_paint: f64,
    #[serde(default)]
    pub largest_contentful_paint: f64,
    #[serde(default)]
    pub cumulative_layout_shift: f64,
    #[serde(default)]
    pub time_to_interactive: f64,
    #[serde(default)]
    pub network_requests: u32,
    #[serde(default)]
    pub memory_usage: f64,
    #[serde(default)]
    pub cpu_usage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    pub fn from_thresholds(value: f64, good: f64, needs_improvement: f64) -> Self {
        if value <= good {
            Rating::Good
        } else if value <= needs_improvement {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Good => f.write_str("good"),
            Rating::NeedsImprovement => f.write_str("needs improvement"),
            Rating::Poor => f.write_str("poor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRating {
    pub metric: &'static str,
    pub value: f64,
    pub rating: Rating,
}

const SLOW_PAGE_LOAD_MS: f64 = 2000.0;
const LAYOUT_SHIFT_LIMIT: f64 = 0.1;
const MEMORY_LIMIT_MB: f64 = 40.0;

impl PerformanceMetrics {
    /// Core web vitals rated against the usual good / needs-improvement bounds.
    pub fn ratings(&self) -> Vec<MetricRating> {
        [
            ("first_contentful_paint", self.first_contentful_paint, 1800.0, 3000.0),
            ("largest_contentful_paint", self.largest_contentful_paint, 2500.0, 4000.0),
            ("cumulative_layout_shift", self.cumulative_layout_shift, 0.1, 0.25),
            ("time_to_interactive", self.time_to_interactive, 3800.0, 7300.0),
        ]
        .into_iter()
        .map(|(metric, value, good, needs_improvement)| MetricRating {
            metric,
            value,
            rating: Rating::from_thresholds(value, good, needs_improvement),
        })
        .collect()
    }

    pub fn recommendations(&self) -> Vec<&'static str> {
        let mut tips = Vec::new();
        if self.page_load_time > SLOW_PAGE_LOAD_MS {
            tips.push(concat!(
                "Page load time is slower than recommended (>2s). ",
                "Consider optimizing images and reducing JavaScript bundle size."
            ));
        }
        if self.cumulative_layout_shift > LAYOUT_SHIFT_LIMIT {
            tips.push(concat!(
                "High cumulative layout shift detected. ",
                "Reserve space for images and ads to improve user experience."
            ));
        }
        if self.memory_usage > MEMORY_LIMIT_MB {
            tips.push(
                "High memory usage detected. Consider optimizing memory-intensive operations.",
            );
        }
        tips
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTestResult {
    #[serde(default)]
    pub metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    Xss,
    SqlInjection,
    Csrf,
    SecurityHeaders,
    SslTls,
    OpenRedirect,
}

impl ScanType {
    pub const ALL: [ScanType; 6] = [
        ScanType::Xss,
        ScanType::SqlInjection,
        ScanType::Csrf,
        ScanType::SecurityHeaders,
        ScanType::SslTls,
        ScanType::OpenRedirect,
    ];

    /// The scans selected when the security page opens.
    pub fn defaults() -> Vec<ScanType> {
        vec![ScanType::Xss, ScanType::SqlInjection, ScanType::Csrf]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScanType::Xss => "Cross-Site Scripting (XSS)",
            ScanType::SqlInjection => "SQL Injection",
            ScanType::Csrf => "Cross-Site Request Forgery",
            ScanType::SecurityHeaders => "Security Headers",
            ScanType::SslTls => "SSL/TLS Configuration",
            ScanType::OpenRedirect => "Open Redirect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub vulnerability_type: String,
    pub severity: Severity,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub remediation: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySummary {
    #[serde(default)]
    pub total_findings: u32,
    #[serde(default)]
    pub critical: u32,
    #[serde(default)]
    pub high: u32,
    #[serde(default)]
    pub medium: u32,
    #[serde(default)]
    pub low: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityTestResult {
    #[serde(default)]
    pub summary: SecuritySummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub findings: Vec<SecurityFinding>,
}

impl SecurityTestResult {
    pub fn is_clean(&self) -> bool {
        self.summary.total_findings == 0
    }

    /// Findings ordered from most to least severe.
    pub fn findings_by_severity(&self) -> Vec<&SecurityFinding> {
        let mut findings: Vec<&SecurityFinding> = self.findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        findings
    }
}

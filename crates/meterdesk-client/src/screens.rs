//! Catalogue of list screens served by the billing API.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use meterdesk_api_models::EnvelopeShape;
use meterdesk_core::{FilterDependencies, ListOptions};

use crate::adjustments::ADJUSTMENTS_PATH;
use crate::endpoint::{EndpointSpec, PageBase};

const REGION_CHAIN: [&str; 3] = ["schemeId", "zoneId", "routeId"];

/// A remote list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Connections cut off for arrears.
    DisconnectedConnections,
    /// Disconnected meters that show consumption again.
    SuspectedReconnections,
    /// Meter register.
    Meters,
    /// Payments received without a matching receipt.
    UnreceiptedPayments,
    /// Outbound SMS log.
    SmsHistory,
    /// Meter reading adjustments awaiting or past approval.
    MeterReadingAdjustments,
}

impl Screen {
    /// Every screen, in menu order.
    pub const ALL: [Self; 6] = [
        Self::DisconnectedConnections,
        Self::SuspectedReconnections,
        Self::Meters,
        Self::UnreceiptedPayments,
        Self::SmsHistory,
        Self::MeterReadingAdjustments,
    ];

    /// Command-line name.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::DisconnectedConnections => "disconnected",
            Self::SuspectedReconnections => "suspected-reconnections",
            Self::Meters => "meters",
            Self::UnreceiptedPayments => "unreceipted-payments",
            Self::SmsHistory => "sms-history",
            Self::MeterReadingAdjustments => "adjustments",
        }
    }

    /// Human-readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::DisconnectedConnections => "Disconnected connections",
            Self::SuspectedReconnections => "Suspected self-reconnections",
            Self::Meters => "Meters",
            Self::UnreceiptedPayments => "Unreceipted payments",
            Self::SmsHistory => "SMS history",
            Self::MeterReadingAdjustments => "Meter reading adjustments",
        }
    }

    /// Endpoints and wire conventions.
    #[must_use]
    pub fn endpoint(self) -> EndpointSpec {
        match self {
            Self::DisconnectedConnections => EndpointSpec::new("/api/v1/connections/disconnected")
                .with_detail("/api/v1/connections"),
            Self::SuspectedReconnections => {
                EndpointSpec::new("/api/v1/connections/suspected-reconnections")
                    .with_detail("/api/v1/connections")
            }
            Self::Meters => EndpointSpec::new("/api/v1/meters")
                .with_detail("/api/v1/meters")
                .with_envelope(EnvelopeShape::DataPagination),
            Self::UnreceiptedPayments => EndpointSpec::new("/api/v1/payments/unreceipted")
                .with_detail("/api/v1/payments")
                .with_id_field("paymentId"),
            Self::SmsHistory => EndpointSpec::new("/api/v1/sms/history")
                .with_envelope(EnvelopeShape::BareArray)
                .with_page_base(PageBase::ZeroBased)
                .with_id_field("smsId"),
            Self::MeterReadingAdjustments => {
                EndpointSpec::new(ADJUSTMENTS_PATH).with_detail(ADJUSTMENTS_PATH)
            }
        }
    }

    /// Filter keys reset when their parent changes.
    #[must_use]
    pub fn dependencies(self) -> FilterDependencies {
        match self {
            Self::DisconnectedConnections | Self::SuspectedReconnections | Self::Meters => {
                FilterDependencies::chain(REGION_CHAIN)
            }
            Self::MeterReadingAdjustments | Self::UnreceiptedPayments => {
                FilterDependencies::chain(["schemeId", "zoneId"])
            }
            Self::SmsHistory => FilterDependencies::new(),
        }
    }

    /// Permissions named by the access-denied notice.
    #[must_use]
    pub const fn permissions(self) -> &'static [&'static str] {
        match self {
            Self::DisconnectedConnections | Self::SuspectedReconnections => &["connections.view"],
            Self::Meters => &["meters.view"],
            Self::UnreceiptedPayments => &["payments.view", "receipts.create"],
            Self::SmsHistory => &["sms.view"],
            Self::MeterReadingAdjustments => &["meter-readings.adjustments.view"],
        }
    }

    /// Columns rendered in tables, in order.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::DisconnectedConnections => &[
                "id",
                "accountNumber",
                "customerName",
                "meterNumber",
                "disconnectedAt",
                "reason",
            ],
            Self::SuspectedReconnections => &[
                "id",
                "accountNumber",
                "customerName",
                "meterNumber",
                "lastReading",
                "detectedAt",
            ],
            Self::Meters => &[
                "id",
                "meterNumber",
                "customerName",
                "schemeName",
                "zoneName",
                "status",
            ],
            Self::UnreceiptedPayments => &[
                "paymentId",
                "transactionCode",
                "accountNumber",
                "amount",
                "paidAt",
            ],
            Self::SmsHistory => &["smsId", "recipient", "message", "status", "sentAt"],
            Self::MeterReadingAdjustments => &[
                "id",
                "meterNumber",
                "previousReading",
                "adjustedReading",
                "status",
                "requestedBy",
            ],
        }
    }

    /// Controller options for this screen.
    #[must_use]
    pub fn list_options(self, debounce: Duration, page_size: u32) -> ListOptions {
        ListOptions::default()
            .with_debounce(debounce)
            .with_page_size(page_size)
            .with_dependencies(self.dependencies())
            .with_required_permissions(self.permissions().iter().copied())
    }
}

impl Display for Screen {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.slug())
    }
}

impl FromStr for Screen {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|screen| screen.slug() == needle)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|screen| screen.slug()).collect();
                format!("unknown screen '{value}' (expected one of: {})", known.join(", "))
            })
    }
}

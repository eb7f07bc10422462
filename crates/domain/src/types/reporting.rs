//! Reporting vocabularies for the performance API
//!
//! The performance endpoint only understands a fixed set of measure and
//! dimension identifiers. Both vocabularies are modelled as fieldless
//! enums whose wire names match the API exactly; unknown identifiers are
//! rejected at the builder boundary, never sent over the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AdknowledgeError;

/// Defines a fieldless vocabulary enum with explicit wire names.
///
/// Wire names cannot be derived mechanically from variant idents
/// (`report_30min` and friends), so every variant carries its literal.
macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant,)+
        }

        impl $name {
            /// Every member of the vocabulary, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The identifier as the API spells it.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            /// Look up a wire identifier; `None` when outside the vocabulary.
            pub fn from_wire(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AdknowledgeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_wire(s).ok_or_else(|| {
                    AdknowledgeError::InvalidArgument(format!(
                        concat!("unknown ", stringify!($name), " identifier: {}"),
                        s
                    ))
                })
            }
        }
    };
}

vocabulary! {
    /// A selectable numeric metric returned by the performance endpoint.
    Measure {
        Revenue => "revenue",
        Schedules => "schedules",
        Clicks => "clicks",
        PaidClicks => "paid_clicks",
        ValidClicks => "valid_clicks",
        InvalidClicks => "invalid_clicks",
        TestClicks => "test_clicks",
        DomesticPaidClicks => "domestic_paid_clicks",
        DomesticUnpaidClicks => "domestic_unpaid_clicks",
        ForeignPaidClicks => "foreign_paid_clicks",
        ForeignUnpaidClicks => "foreign_unpaid_clicks",
        ForeignClicks => "foreign_clicks",
        BadipClicks => "badip_clicks",
        BadagentClicks => "badagent_clicks",
        BadreferrerClicks => "badreferrer_clicks",
        Ecpm => "ecpm",
        Epc => "epc",
        SourceExpense => "source_expense",
        SourceProfit => "source_profit",
        AffiliatePercent => "affiliate_percent",
        GrossRevenue => "gross_revenue",
        Ppc => "ppc",
        Adjustments => "adjustments",
        Promotions => "promotions",
        Referrals => "referrals",
        ExpenseAccruals => "expense_accruals",
        AdjustmentAccruals => "adjustment_accruals",
        PromotionAccruals => "promotion_accruals",
        ReferralAccruals => "referral_accruals",
        Accruals => "accruals",
        TotalPayment => "total_payment",
        SentAmount => "sent_amount",
        DomainGroup => "domain_group",
        SourceAccountName => "source_account_name",
        Records => "records",
    }
}

vocabulary! {
    /// A grouping/filter attribute understood by the performance endpoint.
    Dimension {
        ProductGuid => "product_guid",
        ReportDate => "report_date",
        ReportHour => "report_hour",
        Report30Min => "report_30min",
        Report15Min => "report_15min",
        IsAccrued => "is_accrued",
        RevenueType => "revenue_type",
        SourceProductGuid => "source_product_guid",
        ListId => "list_id",
        ProductId => "product_id",
        SourceAccountName => "source_account_name",
        DomainGroupId => "domain_group_id",
        DomainGroup => "domain_group",
        ReportTime => "report_time",
        Subid => "subid",
        CountryCd => "country_cd",
        AccrualDate => "accrual_date",
        SuppressDate => "suppress_date",
        SuppressMd5 => "suppress_md5",
        SuppressType => "suppress_type",
    }
}

/// A filter criterion key: any dimension, plus the date-range bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    StartDate,
    EndDate,
    Dimension(Dimension),
}

impl FilterKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::StartDate => "start_date",
            FilterKey::EndDate => "end_date",
            FilterKey::Dimension(d) => d.as_str(),
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "start_date" => Some(FilterKey::StartDate),
            "end_date" => Some(FilterKey::EndDate),
            other => Dimension::from_wire(other).map(FilterKey::Dimension),
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pivot configuration for a performance query.
///
/// Either an already-grouped dimension (or the `*` wildcard) whose distinct
/// values become output columns, or a sum/count over a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pivot {
    Field(Dimension),
    Wildcard,
    Sum(Measure),
    Count(Measure),
}

impl Pivot {
    /// Pivot on a dimension identifier, `"*"` meaning all grouped dimensions.
    pub fn field(name: &str) -> Result<Self, AdknowledgeError> {
        if name == "*" {
            return Ok(Pivot::Wildcard);
        }
        Dimension::from_wire(name).map(Pivot::Field).ok_or_else(|| {
            AdknowledgeError::InvalidPivot(format!("pivotted field must be a dimension: {name}"))
        })
    }

    /// Pivot on the sum of a measure.
    pub fn sum(name: &str) -> Result<Self, AdknowledgeError> {
        Measure::from_wire(name).map(Pivot::Sum).ok_or_else(|| {
            AdknowledgeError::InvalidPivot(format!("pivotted value must be a measurement: {name}"))
        })
    }

    /// Pivot on the count of a measure.
    pub fn count(name: &str) -> Result<Self, AdknowledgeError> {
        Measure::from_wire(name).map(Pivot::Count).ok_or_else(|| {
            AdknowledgeError::InvalidPivot(format!("pivotted value must be a measurement: {name}"))
        })
    }

    /// The wire parameter this pivot serializes under (`pivot`, `sum`, `count`).
    pub fn wire_key(self) -> &'static str {
        match self {
            Pivot::Field(_) | Pivot::Wildcard => "pivot",
            Pivot::Sum(_) => "sum",
            Pivot::Count(_) => "count",
        }
    }

    /// The wire value for this pivot.
    pub fn wire_value(self) -> &'static str {
        match self {
            Pivot::Field(d) => d.as_str(),
            Pivot::Wildcard => "*",
            Pivot::Sum(m) | Pivot::Count(m) => m.as_str(),
        }
    }
}

// src/portfolio/models.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Portfolio-wide rollup of every tracked property's current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub total_properties: usize,
    pub active: usize,
    pub pending: usize,
    pub errored: usize,
    pub total_property_value: Decimal,
    pub total_outstanding_loans: Decimal,
    /// Always `total_property_value - total_outstanding_loans`.
    pub total_net_value: Decimal,
    /// Investment-purpose records only, as are the three totals below.
    pub total_annual_rental_income: Decimal,
    pub total_annual_loan_repayments: Decimal,
    pub total_yearly_expenses: Decimal,
    pub overall_yearly_cash_flow: Decimal,
    pub overall_yearly_shortage: Decimal,
    pub is_cash_flow_positive: bool,
    /// Mean over the records that carry a daily change, two decimal places.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_daily_change_percent: Option<Decimal>,
}

/// One day's aggregate value across the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub total_loan: Decimal,
    pub total_net: Decimal,
}

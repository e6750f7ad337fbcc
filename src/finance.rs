use rust_decimal::Decimal;

use crate::models::{PropertyRecord, Purpose, RentFrequency};

/// Raw per-property inputs the derivation works from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialInputs {
    pub purpose: Purpose,
    pub current_value: Option<Decimal>,
    pub outstanding_loan: Option<Decimal>,
    pub monthly_loan_repayment: Option<Decimal>,
    pub rent_amount: Option<Decimal>,
    pub rent_frequency: Option<RentFrequency>,
    pub yearly_expenses: Option<Decimal>,
}

impl From<&PropertyRecord> for FinancialInputs {
    fn from(record: &PropertyRecord) -> Self {
        Self {
            purpose: record.purpose,
            current_value: record.current_value,
            outstanding_loan: record.outstanding_loan,
            monthly_loan_repayment: record.monthly_loan_repayment,
            rent_amount: record.rent_amount,
            rent_frequency: record.rent_frequency,
            yearly_expenses: record.yearly_expenses,
        }
    }
}

/// Metrics derived from [`FinancialInputs`]. An absent input yields an
/// absent metric, never zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedMetrics {
    pub monthly_rent: Option<Decimal>,
    pub net_value: Option<Decimal>,
    pub annual_rental_income: Option<Decimal>,
    pub annual_loan_repayments: Option<Decimal>,
    pub yearly_cash_flow: Option<Decimal>,
    pub yearly_shortage: Option<Decimal>,
}

impl DerivedMetrics {
    pub fn apply_to(&self, record: &mut PropertyRecord) {
        record.monthly_rent = self.monthly_rent;
        record.net_value = self.net_value;
        record.annual_rental_income = self.annual_rental_income;
        record.annual_loan_repayments = self.annual_loan_repayments;
        record.yearly_cash_flow = self.yearly_cash_flow;
        record.yearly_shortage = self.yearly_shortage;
    }
}

/// Derive all financial metrics from raw inputs. Pure; no rounding is applied
/// here (rounding is a presentation concern).
///
/// Rules:
/// - `monthly_rent`: rent normalized to a monthly unit (weekly rent × 52/12).
///   A rent amount without a stated frequency is taken as monthly.
/// - `net_value`: `current_value - (outstanding_loan or 0)`.
/// - `annual_rental_income`: a year of rent (weekly × 52, monthly × 12).
/// - `annual_loan_repayments`: `monthly_loan_repayment × 12`.
/// - `yearly_cash_flow` / `yearly_shortage`: investment properties with known
///   rental income only. `cash_flow = income - outgoings`,
///   `shortage = -cash_flow`; both absent for a primary residence.
pub fn derive(inputs: &FinancialInputs) -> DerivedMetrics {
    let weeks_per_year = Decimal::from(52);
    let months_per_year = Decimal::from(12);

    let frequency = inputs.rent_frequency.unwrap_or(RentFrequency::Monthly);

    let monthly_rent = inputs.rent_amount.map(|rent| match frequency {
        RentFrequency::Weekly => rent * weeks_per_year / months_per_year,
        RentFrequency::Monthly => rent,
    });

    // A year of rent, computed from the quoted amount directly so that weekly
    // figures stay exact instead of inheriting division remainder from the
    // monthly normalization.
    let annual_rental_income = inputs.rent_amount.map(|rent| match frequency {
        RentFrequency::Weekly => rent * weeks_per_year,
        RentFrequency::Monthly => rent * months_per_year,
    });

    let net_value = inputs
        .current_value
        .map(|value| value - inputs.outstanding_loan.unwrap_or(Decimal::ZERO));

    let annual_loan_repayments = inputs
        .monthly_loan_repayment
        .map(|repayment| repayment * months_per_year);

    let (yearly_cash_flow, yearly_shortage) = match (inputs.purpose, annual_rental_income) {
        (Purpose::Investment, Some(income)) => {
            let total_outgoing = annual_loan_repayments.unwrap_or(Decimal::ZERO)
                + inputs.yearly_expenses.unwrap_or(Decimal::ZERO);
            (Some(income - total_outgoing), Some(total_outgoing - income))
        }
        _ => (None, None),
    };

    DerivedMetrics {
        monthly_rent,
        net_value,
        annual_rental_income,
        annual_loan_repayments,
        yearly_cash_flow,
        yearly_shortage,
    }
}

//! Prompt builders for the three report types.
//!
//! The data agent answers natural-language questions with structured
//! tables; these are the exact question shapes each report relies on. The
//! core treats the text as opaque.

/// Report A: recent claims and flood exposure by county for a state.
pub fn property_summary(state: &str) -> String {
    format!(
        "Summarize recent NFIP claims and flood exposure for 15 counties \
         where paid amount is not $0 for {state} state;"
    )
}

/// Report B: claim frequency and average loss by ZIP over the past N years.
pub fn zip_stats(zip_code: &str, years: i64) -> String {
    format!(
        "Return a table with columns zip, loss_year, claims_count, avg_loss \
         where claims_count = COUNT(*) and avg_loss = AVG(total_paid) \
         from dbo.fema_nfip_claims_fact_gold where zip = '{zip_code}' \
         and loss_year >= YEAR(GETDATE()) - {years} \
         group by zip, loss_year \
         order by loss_year desc."
    )
}

/// Report C, first sub-query: county vs state claim severity by year.
pub fn severity_trend(county_code: &str) -> String {
    format!(
        "show Average Claim Severity county vs state for county code \
         {county_code} by year for the latest 10 years;"
    )
}

/// Report C, second sub-query: recent claims above the loss threshold.
pub fn large_losses(county_code: &str, min_loss: i64) -> String {
    format!("list last 10 claims over {min_loss} for county code {county_code};")
}

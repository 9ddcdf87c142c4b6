use crate::cowin_client::{Appointments, Session};
use crate::report::Report;
use crate::scan_types::{DosePreference, SearchCriteria};

/// Build the report of every session the criteria qualify for.
///
/// Centers are skipped outright when their fee type fails the fee preference.
/// Output keeps the upstream order of centers and sessions.
pub fn filter_sessions(appointments: &Appointments, criteria: &SearchCriteria) -> Report {
    let mut report = Report::new();

    for center in &appointments.centers {
        if !criteria.fee().matches(&center.fee_type) {
            continue;
        }

        for session in &center.sessions {
            if is_eligible(session, criteria) {
                report.push_session(center, session);
            }
        }
    }

    report
}

/// Session-level checks: age, vaccine name and dose-specific capacity.
pub fn is_eligible(session: &Session, criteria: &SearchCriteria) -> bool {
    let capacity = dose_capacity(session, criteria.dose());

    session.min_age_limit <= criteria.age()
        && criteria.vaccine().matches(&session.vaccine)
        && capacity > 0.0
        && capacity >= f64::from(criteria.min_capacity())
}

/// Capacity that counts for the requested dose.
pub fn dose_capacity(session: &Session, dose: DosePreference) -> f64 {
    match dose {
        DosePreference::Both => session.available_capacity,
        DosePreference::First => session.available_dose1,
        DosePreference::Second => session.available_dose2,
    }
}

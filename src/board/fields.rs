//! Recognized board columns and the payload names that feed them.

/// One recognized column: the normalized header keys it answers to and the
/// payload aliases read for it, in priority order.
#[derive(Debug)]
pub struct FieldSpec {
    pub headers: &'static [&'static str],
    pub aliases: &'static [&'static str],
}

const fn field(headers: &'static [&'static str], aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec { headers, aliases }
}

pub static FIELDS: &[FieldSpec] = &[
    field(&["id"], &["id"]),
    field(&["key"], &["key", "id"]),
    field(&["client"], &["client"]),
    field(&["clientname"], &["client", "clientName"]),
    // Client health summary
    field(&["firstseendate"], &["first_seen_date", "firstSeenDate"]),
    field(&["lastactivedate"], &["last_active_date", "lastActiveDate"]),
    field(&["pumpkintier"], &["pumpkin_tier", "pumpkinTier"]),
    field(
        &["pumpkinoverridereason"],
        &["pumpkin_override_reason", "pumpkinOverrideReason"],
    ),
    field(&["crfstatus"], &["crf_status", "crfStatus"]),
    field(&["crfscore"], &["crf_score", "crfScore"]),
    field(
        &["crflastevaluatedat"],
        &["crf_last_evaluated_at", "crfLastEvaluatedAt"],
    ),
    field(&["positiveevents30d"], &["positive_events_30d", "positiveEvents30d"]),
    field(&["negativeevents30d"], &["negative_events_30d", "negativeEvents30d"]),
    field(&["hires12m"], &["hires_12m", "hires12m"]),
    field(&["hires24m"], &["hires_24m", "hires24m"]),
    field(&["lasthiredate"], &["last_hire_date", "lastHireDate"]),
    field(&["canonical"], &["canonical", "client"]),
    field(&["alias"], &["alias"]),
    // Pipeline
    field(&["jobtitle"], &["jobTitle", "job_title"]),
    field(&["businessline"], &["businessLine", "business_line"]),
    field(&["recruiter"], &["recruiter"]),
    field(&["candidate"], &["candidate", "candidate_name"]),
    field(&["stage"], &["stage"]),
    field(&["stagedate"], &["stageDate", "stage_date"]),
    field(&["risk"], &["risk"]),
    field(&["notes"], &["notes", "action_notes"]),
    field(&["noteslog", "noteshistory"], &["notesLog", "notes_log"]),
    // Tasks
    field(&["tasktext"], &["taskText", "task_text"]),
    field(&["taskstatus"], &["taskStatus", "task_status"]),
    field(&["taskcreatedat"], &["taskCreatedAt", "task_created_at"]),
    field(
        &["tasklastnotifiedat"],
        &["taskLastNotifiedAt", "task_last_notified_at"],
    ),
    field(
        &["taskfirstnotifiedat"],
        &["taskFirstNotifiedAt", "task_first_notified_at"],
    ),
    field(
        &["tasksecondnotifiedat"],
        &["taskSecondNotifiedAt", "task_second_notified_at"],
    ),
    field(
        &["taskthirdnotifiedat"],
        &["taskThirdNotifiedAt", "task_third_notified_at"],
    ),
    field(&["taskcompletedat"], &["taskCompletedAt", "task_completed_at"]),
    field(
        &["taskcompletednotifiedat"],
        &["taskCompletedNotifiedAt", "task_completed_notified_at"],
    ),
    field(&["rate"], &["rate"]),
    field(&["createdat"], &["createdAt", "created_at"]),
    field(&["createdby"], &["createdBy", "created_by"]),
    field(&["updatedat"], &["updatedAt", "updated_at"]),
    field(&["updatedby"], &["updatedBy", "updated_by"]),
    // Pending hires
    field(&["startdate"], &["startDate", "start_date"]),
    field(&["startyear"], &["startYear", "start_year"]),
    field(&["status"], &["status", "pending_status"]),
    field(&["submittedtoam"], &["submitted_to_am", "submittedToAm"]),
    field(&["submittedtoclient"], &["submitted_to_client", "submittedToClient"]),
    field(&["interviewrequested"], &["interview_requested", "interviewRequested"]),
    field(
        &["interviewrequesteddate"],
        &["interview_requested_date", "interviewRequestedDate"],
    ),
    field(&["interview1"], &["interview_1", "interview1"]),
    field(&["interview2"], &["interview_2", "interview2"]),
    field(&["interview3"], &["interview_3", "interview3"]),
    field(&["offerdate"], &["offer_date", "offerDate"]),
    field(&["colextendeddate"], &["col_extended_date", "colExtendedDate"]),
    field(&["colsigneddate"], &["col_signed_date", "colSignedDate"]),
    field(&["verbalofferdate"], &["verbal_offer_date", "verbalOfferDate"]),
    field(&["offerextendeddate"], &["offer_extended_date", "offerExtendedDate"]),
    field(&["offeraccepteddate"], &["offer_accepted_date", "offerAcceptedDate"]),
    field(&["pendingstartdate"], &["pendingStartDate", "pending_start_date"]),
    field(
        &["clearancecrossoverdate"],
        &["clearanceCrossoverDate", "clearance_crossover_date"],
    ),
    field(&["startedworkdate"], &["startedWorkDate", "started_work_date"]),
];

/// Payload aliases for a normalized header key, or `None` when the column
/// is not recognized.
pub fn aliases_for(header_key: &str) -> Option<&'static [&'static str]> {
    FIELDS
        .iter()
        .find(|f| f.headers.contains(&header_key))
        .map(|f| f.aliases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn header_keys_are_unique_and_normalized() {
        let mut seen = HashSet::new();
        for spec in FIELDS {
            for header in spec.headers {
                assert!(seen.insert(*header), "duplicate header key {header}");
                assert!(
                    header.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
                    "header key {header} is not normalized"
                );
            }
            assert!(!spec.aliases.is_empty());
        }
    }

    #[test]
    fn notes_history_shares_notes_log_aliases() {
        assert_eq!(aliases_for("noteshistory"), aliases_for("noteslog"));
        assert_eq!(aliases_for("noteslog"), Some(&["notesLog", "notes_log"][..]));
    }

    #[test]
    fn unknown_header_is_not_recognized() {
        assert_eq!(aliases_for("favoritecolor"), None);
        assert_eq!(aliases_for(""), None);
    }
}

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

use crate::model::{
    AttendancePair, AttendanceStatus, ClassSchedule, CreateAttendance, ExistingAttendanceRecord,
};
use crate::remote::{AttendanceApi, FetchError, SubmitError};
use crate::sms::{absence_message, SmsDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Submitting,
    Done,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Submitting => "submitting",
            Phase::Done => "done",
            Phase::Error => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("attendance has not been marked for every student")]
    Incomplete,
    #[error("{0}")]
    Submit(#[from] SubmitError),
    #[error("unknown student: {0}")]
    UnknownStudent(String),
    #[error("{op} is not allowed while the session is {phase}")]
    BadPhase { op: &'static str, phase: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Updated,
}

/// One open (class, date) marking session.
///
/// Phases: Idle -> Loading -> Ready -> Submitting -> Done | Error, with Ready
/// re-entrant: edits and reset from Done/Error drop the session back into
/// Ready, and a failed submit can be retried from Error without re-fetching.
/// Update mode vs create mode is decided once, at open time, by whether the
/// server already holds a record for the (class, date) pair.
pub struct AttendanceSession {
    class_id: String,
    date: NaiveDate,
    phase: Phase,
    schedule: Option<ClassSchedule>,
    marks: HashMap<String, Option<AttendanceStatus>>,
    existing: Option<ExistingAttendanceRecord>,
    last_error: Option<String>,
}

impl AttendanceSession {
    pub fn new(class_id: &str, date: NaiveDate) -> AttendanceSession {
        AttendanceSession {
            class_id: class_id.to_string(),
            date,
            phase: Phase::Idle,
            schedule: None,
            marks: HashMap::new(),
            existing: None,
            last_error: None,
        }
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn schedule(&self) -> Option<&ClassSchedule> {
        self.schedule.as_ref()
    }

    pub fn marks(&self) -> &HashMap<String, Option<AttendanceStatus>> {
        &self.marks
    }

    pub fn existing_record(&self) -> Option<&ExistingAttendanceRecord> {
        self.existing.as_ref()
    }

    pub fn is_update_mode(&self) -> bool {
        self.existing.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fetches the roster, then checks for a record already covering this
    /// (class, date). Marks are prefilled from that record when it exists;
    /// otherwise every roster student starts unset. On failure nothing of a
    /// partially loaded roster survives.
    pub fn open(&mut self, api: &dyn AttendanceApi) -> Result<(), SessionError> {
        self.phase = Phase::Loading;
        self.schedule = None;
        self.marks.clear();
        self.existing = None;
        self.last_error = None;

        match self.load(api) {
            Ok(()) => {
                self.phase = Phase::Ready;
                Ok(())
            }
            Err(e) => {
                self.schedule = None;
                self.marks.clear();
                self.existing = None;
                self.phase = Phase::Error;
                self.last_error = Some(e.to_string());
                Err(SessionError::Fetch(e))
            }
        }
    }

    fn load(&mut self, api: &dyn AttendanceApi) -> Result<(), FetchError> {
        let schedule = api.fetch_schedule(&self.class_id)?;
        let existing = api.check_existing(&self.class_id, self.date)?;

        // The key set is exactly the roster's id set. Record entries for
        // students no longer on the roster are dropped on the floor.
        self.marks = schedule
            .students
            .iter()
            .map(|s| (s.id.clone(), None))
            .collect();
        if let Some(record) = &existing {
            for entry in &record.attendance_records {
                if let Some(mark) = self.marks.get_mut(&entry.student.id) {
                    *mark = Some(entry.status);
                }
            }
        }

        self.schedule = Some(schedule);
        self.existing = existing;
        Ok(())
    }

    /// Overwrites one student's mark. No completeness check here; that is
    /// `validate`'s job at submit time.
    pub fn set_mark(
        &mut self,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Result<(), SessionError> {
        self.reenter_ready("setMark")?;
        match self.marks.get_mut(student_id) {
            Some(mark) => {
                *mark = Some(status);
                Ok(())
            }
            None => Err(SessionError::UnknownStudent(student_id.to_string())),
        }
    }

    /// Clears every mark back to unset and discards the existing-record
    /// reference, so the next submit goes through the create endpoint even if
    /// a record had been found at open time.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.reenter_ready("reset")?;
        for mark in self.marks.values_mut() {
            *mark = None;
        }
        self.existing = None;
        Ok(())
    }

    fn reenter_ready(&mut self, op: &'static str) -> Result<(), SessionError> {
        match self.phase {
            Phase::Ready => Ok(()),
            Phase::Done | Phase::Error if self.schedule.is_some() => {
                self.phase = Phase::Ready;
                self.last_error = None;
                Ok(())
            }
            other => Err(SessionError::BadPhase {
                op,
                phase: other.as_str(),
            }),
        }
    }

    /// True iff the roster is loaded and no mark is unset.
    pub fn validate(&self) -> bool {
        self.schedule.is_some() && self.marks.values().all(|m| m.is_some())
    }

    /// Roster-ordered ids still waiting for a mark.
    pub fn unmarked_students(&self) -> Vec<String> {
        let Some(schedule) = &self.schedule else {
            return Vec::new();
        };
        schedule
            .students
            .iter()
            .filter(|s| matches!(self.marks.get(&s.id), Some(None)))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Submits the marks, creating or updating depending on the mode decided
    /// at open time. Absence notifications go out first, sequentially and
    /// best-effort; a dispatch failure never blocks the remaining dispatches
    /// or the submission itself.
    pub fn submit(
        &mut self,
        api: &dyn AttendanceApi,
        sms: &dyn SmsDispatcher,
    ) -> Result<SubmitOutcome, SessionError> {
        match self.phase {
            Phase::Ready => {}
            Phase::Error if self.schedule.is_some() => {}
            other => {
                return Err(SessionError::BadPhase {
                    op: "submit",
                    phase: other.as_str(),
                })
            }
        }
        if !self.validate() {
            return Err(SessionError::Incomplete);
        }

        self.last_error = None;
        self.phase = Phase::Submitting;

        let Some(schedule) = self.schedule.as_ref() else {
            // validate() above guarantees a loaded roster.
            self.phase = Phase::Error;
            return Err(SessionError::BadPhase {
                op: "submit",
                phase: Phase::Idle.as_str(),
            });
        };

        // Pairs follow roster order, not map iteration order. The absent
        // fallback is unreachable past validate(); it exists as a last-resort
        // guard and is loud if it ever fires.
        let pairs: Vec<AttendancePair> = schedule
            .students
            .iter()
            .map(|s| {
                let status = self.marks.get(&s.id).copied().flatten().unwrap_or_else(|| {
                    log::error!(
                        "student {} reached submit with no mark; defaulting to absent",
                        s.id
                    );
                    AttendanceStatus::Absent
                });
                AttendancePair {
                    student: s.id.clone(),
                    status,
                }
            })
            .collect();

        let class_name = schedule.subject.subject_name.clone();
        for (student, pair) in schedule.students.iter().zip(&pairs) {
            if pair.status != AttendanceStatus::Absent {
                continue;
            }
            let Some(phone) = student.parent_no.as_deref() else {
                log::info!(
                    "no guardian number for {}; skipping absence notification",
                    student.id
                );
                continue;
            };
            let message = absence_message(student, &class_name, self.date);
            if let Err(e) = sms.send(phone, &message) {
                log::warn!("absence notification for {} failed: {}", student.id, e);
            }
        }

        let result = match &self.existing {
            Some(record) => api
                .update_attendance(&record.id, &pairs)
                .map(|()| SubmitOutcome::Updated),
            None => api
                .create_attendance(&CreateAttendance {
                    class_schedule: self.class_id.clone(),
                    attendance_date: self.date.format("%Y-%m-%d").to_string(),
                    days_of_week: self.date.format("%A").to_string(),
                    attendance_records: pairs,
                })
                .map(|()| SubmitOutcome::Created),
        };

        match result {
            Ok(outcome) => {
                self.phase = Phase::Done;
                Ok(outcome)
            }
            Err(e) => {
                self.phase = Phase::Error;
                self.last_error = Some(e.to_string());
                Err(SessionError::Submit(e))
            }
        }
    }

    /// Read-only aggregate query for this session's class. Not part of the
    /// submission state machine; failures propagate and nothing local moves.
    pub fn stats(
        &self,
        api: &dyn AttendanceApi,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<serde_json::Value, FetchError> {
        api.stats(&self.class_id, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Course, ExistingEntry, Student, StudentRef, StudentUser, Subject, TeacherSchedules};
    use crate::sms::DispatchError;
    use std::cell::RefCell;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn student(id: &str, first: &str, last: &str, parent_no: Option<&str>) -> Student {
        Student {
            id: id.to_string(),
            user: StudentUser {
                first_name: first.to_string(),
                middle_name: None,
                last_name: last.to_string(),
            },
            student_id: None,
            level: None,
            section: None,
            parent_name: None,
            parent_no: parent_no.map(|p| p.to_string()),
        }
    }

    fn schedule(class_id: &str, students: Vec<Student>) -> ClassSchedule {
        ClassSchedule {
            id: class_id.to_string(),
            subject: Subject {
                subject_name: "Mathematics".to_string(),
            },
            course: Course {
                course_name: "Grade 7".to_string(),
            },
            section: None,
            start_time: None,
            end_time: None,
            week_days: vec![],
            students,
        }
    }

    fn record(id: &str, entries: &[(&str, AttendanceStatus)]) -> ExistingAttendanceRecord {
        ExistingAttendanceRecord {
            id: id.to_string(),
            attendance_date: None,
            attendance_records: entries
                .iter()
                .map(|(sid, status)| ExistingEntry {
                    student: StudentRef {
                        id: sid.to_string(),
                    },
                    status: *status,
                })
                .collect(),
        }
    }

    #[derive(Default)]
    struct MockApi {
        schedule: Option<ClassSchedule>,
        existing: Option<ExistingAttendanceRecord>,
        fail_fetch: Option<String>,
        fail_check: Option<String>,
        fail_submit: RefCell<Option<String>>,
        created: RefCell<Vec<CreateAttendance>>,
        updated: RefCell<Vec<(String, Vec<AttendancePair>)>>,
    }

    impl MockApi {
        fn submit_calls(&self) -> usize {
            self.created.borrow().len() + self.updated.borrow().len()
        }
    }

    impl AttendanceApi for MockApi {
        fn fetch_schedule(&self, _class_id: &str) -> Result<ClassSchedule, FetchError> {
            if let Some(msg) = &self.fail_fetch {
                return Err(FetchError::Server(msg.clone()));
            }
            Ok(self.schedule.clone().unwrap())
        }

        fn check_existing(
            &self,
            _class_id: &str,
            _date: NaiveDate,
        ) -> Result<Option<ExistingAttendanceRecord>, FetchError> {
            if let Some(msg) = &self.fail_check {
                return Err(FetchError::Server(msg.clone()));
            }
            Ok(self.existing.clone())
        }

        fn create_attendance(&self, payload: &CreateAttendance) -> Result<(), SubmitError> {
            if let Some(msg) = self.fail_submit.borrow().clone() {
                return Err(SubmitError::Server(msg));
            }
            self.created.borrow_mut().push(payload.clone());
            Ok(())
        }

        fn update_attendance(
            &self,
            record_id: &str,
            pairs: &[AttendancePair],
        ) -> Result<(), SubmitError> {
            if let Some(msg) = self.fail_submit.borrow().clone() {
                return Err(SubmitError::Server(msg));
            }
            self.updated
                .borrow_mut()
                .push((record_id.to_string(), pairs.to_vec()));
            Ok(())
        }

        fn stats(
            &self,
            _class_id: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<serde_json::Value, FetchError> {
            Ok(serde_json::json!({ "presentCount": 0 }))
        }

        fn teacher_schedules(&self, _teacher_id: &str) -> Result<TeacherSchedules, FetchError> {
            unreachable!("not used by session tests")
        }

        fn notification_logs(&self, _teacher_id: &str) -> Result<serde_json::Value, FetchError> {
            unreachable!("not used by session tests")
        }

        fn login(&self, _email: &str, _password: &str) -> Result<serde_json::Value, FetchError> {
            unreachable!("not used by session tests")
        }
    }

    #[derive(Default)]
    struct MockSms {
        sent: RefCell<Vec<(String, String)>>,
        fail_numbers: Vec<String>,
    }

    impl SmsDispatcher for MockSms {
        fn send(&self, phone_number: &str, message: &str) -> Result<(), DispatchError> {
            if self.fail_numbers.iter().any(|n| n == phone_number) {
                return Err(DispatchError::Gateway("gateway rejected".to_string()));
            }
            self.sent
                .borrow_mut()
                .push((phone_number.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn two_student_api() -> MockApi {
        MockApi {
            schedule: Some(schedule(
                "C2",
                vec![
                    student("S3", "Ana", "Reyes", Some("+63917000001")),
                    student("S4", "Ben", "Cruz", Some("+63917000002")),
                ],
            )),
            ..MockApi::default()
        }
    }

    #[test]
    fn open_initializes_unset_marks_for_full_roster() {
        let api = two_student_api();
        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();

        assert_eq!(session.phase(), Phase::Ready);
        assert!(!session.is_update_mode());
        assert_eq!(session.marks().len(), 2);
        assert!(session.marks().keys().all(|id| id == "S3" || id == "S4"));
        assert!(session.marks().values().all(|m| m.is_none()));
    }

    #[test]
    fn open_prefills_marks_from_existing_record() {
        let mut api = MockApi {
            schedule: Some(schedule(
                "C1",
                vec![
                    student("S1", "Ana", "Reyes", None),
                    student("S2", "Ben", "Cruz", None),
                    student("S5", "Carla", "Lim", None),
                ],
            )),
            ..MockApi::default()
        };
        // The record also carries a student who has left the roster; that
        // entry must not widen the key set.
        api.existing = Some(record(
            "A1",
            &[
                ("S1", AttendanceStatus::Present),
                ("S2", AttendanceStatus::Absent),
                ("GONE", AttendanceStatus::Late),
            ],
        ));

        let mut session = AttendanceSession::new("C1", d("2024-10-20"));
        session.open(&api).unwrap();

        assert!(session.is_update_mode());
        assert_eq!(session.marks().len(), 3);
        assert_eq!(session.marks()["S1"], Some(AttendanceStatus::Present));
        assert_eq!(session.marks()["S2"], Some(AttendanceStatus::Absent));
        assert_eq!(session.marks()["S5"], None);
        assert!(!session.marks().contains_key("GONE"));
    }

    #[test]
    fn open_failure_retains_no_partial_roster() {
        let mut api = two_student_api();
        api.fail_check = Some("attendance check unavailable".to_string());

        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        let err = session.open(&api).unwrap_err();

        assert!(matches!(err, SessionError::Fetch(_)));
        assert_eq!(session.phase(), Phase::Error);
        assert!(session.schedule().is_none());
        assert!(session.marks().is_empty());
        assert_eq!(session.last_error(), Some("attendance check unavailable"));
    }

    #[test]
    fn validate_requires_every_student_marked() {
        let api = two_student_api();
        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();

        assert!(!session.validate());
        session.set_mark("S3", AttendanceStatus::Present).unwrap();
        assert!(!session.validate());
        assert_eq!(session.unmarked_students(), vec!["S4".to_string()]);
        session.set_mark("S4", AttendanceStatus::Late).unwrap();
        assert!(session.validate());
        assert!(session.unmarked_students().is_empty());
    }

    #[test]
    fn set_mark_rejects_unknown_student() {
        let api = two_student_api();
        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();

        let err = session
            .set_mark("NOPE", AttendanceStatus::Present)
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownStudent(_)));
        assert_eq!(session.marks().len(), 2);
    }

    #[test]
    fn submit_with_unmarked_students_makes_no_network_call() {
        let api = two_student_api();
        let sms = MockSms::default();
        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();
        session.set_mark("S3", AttendanceStatus::Present).unwrap();

        let err = session.submit(&api, &sms).unwrap_err();

        assert!(matches!(err, SessionError::Incomplete));
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(api.submit_calls(), 0);
        assert!(sms.sent.borrow().is_empty());
    }

    #[test]
    fn submit_creates_with_weekday_and_notifies_absent() {
        let api = two_student_api();
        let sms = MockSms::default();
        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();
        session.set_mark("S3", AttendanceStatus::Present).unwrap();
        session.set_mark("S4", AttendanceStatus::Absent).unwrap();

        let outcome = session.submit(&api, &sms).unwrap();

        assert_eq!(outcome, SubmitOutcome::Created);
        assert_eq!(session.phase(), Phase::Done);

        let created = api.created.borrow();
        assert_eq!(created.len(), 1);
        let payload = &created[0];
        assert_eq!(payload.class_schedule, "C2");
        assert_eq!(payload.attendance_date, "2024-10-21");
        assert_eq!(payload.days_of_week, "Monday");
        let pairs: Vec<(&str, AttendanceStatus)> = payload
            .attendance_records
            .iter()
            .map(|p| (p.student.as_str(), p.status))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("S3", AttendanceStatus::Present),
                ("S4", AttendanceStatus::Absent),
            ]
        );

        let sent = sms.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+63917000002");
        assert!(sent[0].1.contains("Ben Cruz"));
        assert!(sent[0].1.contains("Mathematics"));
        assert!(sent[0].1.contains("October 21, 2024"));
    }

    #[test]
    fn submit_updates_existing_record_without_edits() {
        let mut api = MockApi {
            schedule: Some(schedule(
                "C1",
                vec![
                    student("S1", "Ana", "Reyes", None),
                    student("S2", "Ben", "Cruz", None),
                ],
            )),
            ..MockApi::default()
        };
        api.existing = Some(record(
            "A1",
            &[
                ("S1", AttendanceStatus::Present),
                ("S2", AttendanceStatus::Absent),
            ],
        ));
        let sms = MockSms::default();

        let mut session = AttendanceSession::new("C1", d("2024-10-20"));
        session.open(&api).unwrap();
        let outcome = session.submit(&api, &sms).unwrap();

        assert_eq!(outcome, SubmitOutcome::Updated);
        assert_eq!(session.phase(), Phase::Done);
        let updated = api.updated.borrow();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].0, "A1");
        let pairs: Vec<(&str, AttendanceStatus)> = updated[0]
            .1
            .iter()
            .map(|p| (p.student.as_str(), p.status))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("S1", AttendanceStatus::Present),
                ("S2", AttendanceStatus::Absent),
            ]
        );
    }

    #[test]
    fn failed_submit_keeps_marks_and_allows_retry() {
        let api = two_student_api();
        *api.fail_submit.borrow_mut() = Some("duplicate record".to_string());
        let sms = MockSms::default();

        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();
        session.set_mark("S3", AttendanceStatus::Present).unwrap();
        session.set_mark("S4", AttendanceStatus::Excused).unwrap();

        let err = session.submit(&api, &sms).unwrap_err();
        assert!(matches!(err, SessionError::Submit(_)));
        assert_eq!(session.phase(), Phase::Error);
        assert_eq!(session.last_error(), Some("duplicate record"));
        assert_eq!(session.marks()["S3"], Some(AttendanceStatus::Present));
        assert_eq!(session.marks()["S4"], Some(AttendanceStatus::Excused));

        // User-initiated retry from Error, no re-fetch.
        *api.fail_submit.borrow_mut() = None;
        let outcome = session.submit(&api, &sms).unwrap();
        assert_eq!(outcome, SubmitOutcome::Created);
        assert_eq!(session.phase(), Phase::Done);
    }

    #[test]
    fn dispatcher_failure_does_not_stop_dispatches_or_submission() {
        let api = MockApi {
            schedule: Some(schedule(
                "C2",
                vec![
                    student("S3", "Ana", "Reyes", Some("+63917000001")),
                    student("S4", "Ben", "Cruz", Some("+63917000002")),
                ],
            )),
            ..MockApi::default()
        };
        let sms = MockSms {
            fail_numbers: vec!["+63917000001".to_string()],
            ..MockSms::default()
        };

        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();
        session.set_mark("S3", AttendanceStatus::Absent).unwrap();
        session.set_mark("S4", AttendanceStatus::Absent).unwrap();

        let outcome = session.submit(&api, &sms).unwrap();

        assert_eq!(outcome, SubmitOutcome::Created);
        // The first dispatch failed; the second still went out.
        let sent = sms.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+63917000002");
        assert_eq!(api.created.borrow().len(), 1);
    }

    #[test]
    fn students_without_guardian_numbers_are_skipped() {
        let api = MockApi {
            schedule: Some(schedule(
                "C2",
                vec![student("S3", "Ana", "Reyes", None)],
            )),
            ..MockApi::default()
        };
        let sms = MockSms::default();

        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();
        session.set_mark("S3", AttendanceStatus::Absent).unwrap();
        session.submit(&api, &sms).unwrap();

        assert!(sms.sent.borrow().is_empty());
        assert_eq!(api.created.borrow().len(), 1);
    }

    #[test]
    fn reset_clears_prefill_and_forces_create_mode() {
        let mut api = MockApi {
            schedule: Some(schedule(
                "C1",
                vec![
                    student("S1", "Ana", "Reyes", None),
                    student("S2", "Ben", "Cruz", None),
                ],
            )),
            ..MockApi::default()
        };
        api.existing = Some(record(
            "A1",
            &[
                ("S1", AttendanceStatus::Present),
                ("S2", AttendanceStatus::Absent),
            ],
        ));
        let sms = MockSms::default();

        let mut session = AttendanceSession::new("C1", d("2024-10-20"));
        session.open(&api).unwrap();
        assert!(session.is_update_mode());

        session.reset().unwrap();
        assert!(!session.is_update_mode());
        assert!(session.marks().values().all(|m| m.is_none()));

        // Idempotent.
        session.reset().unwrap();
        assert!(!session.is_update_mode());
        assert!(session.marks().values().all(|m| m.is_none()));

        session.set_mark("S1", AttendanceStatus::Present).unwrap();
        session.set_mark("S2", AttendanceStatus::Present).unwrap();
        session.submit(&api, &sms).unwrap();

        // Reset discarded the record, so this went through create.
        assert_eq!(api.updated.borrow().len(), 0);
        assert_eq!(api.created.borrow().len(), 1);
    }

    #[test]
    fn edits_after_done_reenter_ready() {
        let api = two_student_api();
        let sms = MockSms::default();
        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();
        session.set_mark("S3", AttendanceStatus::Present).unwrap();
        session.set_mark("S4", AttendanceStatus::Present).unwrap();
        session.submit(&api, &sms).unwrap();
        assert_eq!(session.phase(), Phase::Done);

        session.set_mark("S3", AttendanceStatus::Late).unwrap();
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.marks()["S3"], Some(AttendanceStatus::Late));
    }

    #[test]
    fn operations_before_open_are_rejected() {
        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        assert!(matches!(
            session.set_mark("S3", AttendanceStatus::Present),
            Err(SessionError::BadPhase { .. })
        ));
        assert!(matches!(session.reset(), Err(SessionError::BadPhase { .. })));

        let api = two_student_api();
        let sms = MockSms::default();
        assert!(matches!(
            session.submit(&api, &sms),
            Err(SessionError::BadPhase { .. })
        ));
    }

    #[test]
    fn stats_does_not_touch_session_state() {
        let api = two_student_api();
        let mut session = AttendanceSession::new("C2", d("2024-10-21"));
        session.open(&api).unwrap();
        session.set_mark("S3", AttendanceStatus::Present).unwrap();

        let stats = session
            .stats(&api, d("2024-10-01"), d("2024-10-31"))
            .unwrap();
        assert_eq!(stats["presentCount"], 0);
        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.marks()["S3"], Some(AttendanceStatus::Present));
    }
}

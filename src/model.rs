use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }

    pub fn parse(s: &str) -> Option<AttendanceStatus> {
        match s {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "late" => Some(AttendanceStatus::Late),
            "excused" => Some(AttendanceStatus::Excused),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentUser {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
}

/// Roster entry as served by the class-schedule endpoint. `student_id` is the
/// school-visible number, distinct from the `_id` database identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: StudentUser,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub parent_no: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.user.first_name, self.user.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub subject_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchedule {
    #[serde(rename = "_id")]
    pub id: String,
    pub subject: Subject,
    pub course: Course,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub week_days: Vec<String>,
    #[serde(default)]
    pub students: Vec<Student>,
}

/// `attendanceRecords[].student` comes back populated; only the identity is
/// needed on this side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRef {
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingEntry {
    pub student: StudentRef,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingAttendanceRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub attendance_date: Option<String>,
    pub attendance_records: Vec<ExistingEntry>,
}

/// Body of `POST attendance`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendance {
    pub class_schedule: String,
    pub attendance_date: String,
    pub days_of_week: String,
    pub attendance_records: Vec<AttendancePair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendancePair {
    pub student: String,
    pub status: AttendanceStatus,
}

/// Teacher dashboard listing: the raw schedule rows plus the same rows
/// grouped by weekday name for the calendar screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSchedules {
    #[serde(default)]
    pub raw_schedules: Vec<ClassSchedule>,
    #[serde(default)]
    pub grouped_schedules: HashMap<String, Vec<ClassSchedule>>,
}

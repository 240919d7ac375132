//! Attendance records pulled from the DLB roll-call system

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::brigade::BrigadeId;
use crate::client::MusterId;

/// How a member was recorded against a muster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Apology,
    Absent,
}

/// One member's attendance row for one muster, as reported by DLB
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    muster_id: MusterId,
    member_ref: String,
    date: NaiveDate,
    status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn new<M: ToString, R: ToString>(
        muster_id: M,
        member_ref: R,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Self {
        Self {
            muster_id: muster_id.to_string(),
            member_ref: member_ref.to_string(),
            date,
            status,
        }
    }

    pub fn muster_id(&self) -> &MusterId {
        &self.muster_id
    }

    /// The DLB-side member reference; mapping it to a portal member is the caller's concern
    pub fn member_ref(&self) -> &str {
        &self.member_ref
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn status(&self) -> AttendanceStatus {
        self.status
    }
}

/// Filters for an attendance fetch. Unset fields are not sent to the server
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttendanceFilter {
    pub brigade_id: Option<BrigadeId>,
    pub muster_id: Option<MusterId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AttendanceFilter {
    /// A filter covering one brigade over a date window
    pub fn for_brigade(brigade_id: &BrigadeId, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            brigade_id: Some(brigade_id.clone()),
            muster_id: None,
            from: Some(from),
            to: Some(to),
        }
    }
}

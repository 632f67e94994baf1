use chrono::Utc;

use crate::models::TimeSlot;

pub struct InviteDetails<'a> {
    pub slot: &'a TimeSlot,
    pub summary: &'a str,
    pub description: &'a str,
    pub organizer_name: &'a str,
    pub organizer_email: &'a str,
    pub attendee_email: &'a str,
}

/// Render a VCALENDAR invite for a confirmed slot. Attached to CONFIRM
/// replies; the byte encoding here is the whole contract, there is no
/// separate invite library.
pub fn generate_ics(details: &InviteDetails<'_>) -> String {
    let dtstart = format!(
        "{}T{}00",
        details.slot.date().format("%Y%m%d"),
        details.slot.start_time().format("%H%M")
    );
    let dtend = format!(
        "{}T{}00",
        details.slot.date().format("%Y%m%d"),
        details.slot.end_time().format("%H%M")
    );
    let dtstamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@frontdesk", uuid::Uuid::new_v4());

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Frontdesk//Scheduling Assistant//EN\r\n\
         METHOD:REQUEST\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{}\r\n\
         DESCRIPTION:{}\r\n\
         ORGANIZER;CN={}:mailto:{}\r\n\
         ATTENDEE;CN={};RSVP=TRUE;PARTSTAT=NEEDS-ACTION:mailto:{}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n",
        details.summary,
        details.description,
        details.organizer_name,
        details.organizer_email,
        details.attendee_email,
        details.attendee_email,
    )
}

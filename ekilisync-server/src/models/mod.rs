//! This module contains all the models used in the application.
pub mod attendance;
pub mod employee;
pub mod identity;
pub mod office;
pub mod passcode;
pub mod refresh_token;

pub use attendance::{Attendance, AttendanceCorrection, AttendanceEntry, CheckOut, NewAttendance};
pub use employee::{Employee, NewEmployee};
pub use identity::{Identity, NewIdentity};
pub use office::{NewOffice, Office, OfficeChangeset};
pub use passcode::{NewPasscode, Passcode};
pub use refresh_token::{NewRefreshToken, RefreshToken};

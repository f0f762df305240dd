mod attendance;
mod email_record;
mod image;
mod mentorship;
mod post;
mod session;
mod submission;
mod subscription;
mod user;
mod workshop;

pub use attendance::Attendance;
pub use email_record::EmailRecord;
pub use image::Image;
pub use mentorship::Mentorship;
pub use post::{Post, PostInput};
pub use session::{SESSION_AGE_SECONDS, Session};
pub use submission::{Feedback, Incident, NewIncident, NewSubmission, Proposal, Request, Submission};
pub use subscription::{Subscription, unsubscribe_path};
pub use user::{User, UserProfileUpdate};
pub use workshop::{Workshop, WorkshopInput, WorkshopSchedule};

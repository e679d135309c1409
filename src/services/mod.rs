pub mod booking;
pub mod verification;

pub use booking::BookingService;
pub use verification::{VerificationService, VerificationStore};

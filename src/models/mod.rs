pub mod money;
pub mod showtime;
pub mod seat;
pub mod ticket;
pub mod booking;

pub use money::Money;
pub use showtime::Showtime;
pub use seat::{Seat, SeatAvailability, SeatStatus};
pub use ticket::{NewTicket, Ticket};
pub use booking::{BookTicketRequest, BookingReceipt};

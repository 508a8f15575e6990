// ABOUTME: Resource reservation subsystem for shared, named resources
// ABOUTME: Advisory time-windowed claims with priority-based conflict resolution

pub mod reservation;

pub use reservation::{
    ReservationManager, ReservationRequest, ResourceRequest, ResourceReservation,
};

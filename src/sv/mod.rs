pub mod node;
pub mod payment;
pub mod quiz;
pub mod user;

pub use node::Node;
pub use payment::Payment;
pub use quiz::Quiz;
pub use user::User;

mod fact_request_dispatcher;

pub use fact_request_dispatcher::FactRequestDispatcher;

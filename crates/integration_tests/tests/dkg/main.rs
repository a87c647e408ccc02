mod test_utils;

mod http;
mod keygen;
mod rejection;
mod timeout;

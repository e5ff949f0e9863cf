mod body_handler;
mod capabilities;
mod config;
mod encrypted_channel_proptest;
mod info_endpoint;
mod pairing_server;
mod receiver;
mod request_router;
mod response_builder;
mod session_state_tests;
mod setup_handler;

//! Test suites exercising the client against a scripted server.

mod support;

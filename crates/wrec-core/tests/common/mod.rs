pub mod size_server;

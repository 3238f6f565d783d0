mod lifecycle;
mod reconnect;
mod routing;

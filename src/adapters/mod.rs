//! Adapters — network interface consumers and concrete transports.
//!
//! | Adapter     | Role                       | Connects to                    |
//! |-------------|----------------------------|--------------------------------|
//! | `wifi`      | WiFi event handler + API   | CommandChannel, rendezvous     |
//! | `ethernet`  | Ethernet event handler     | CommandChannel (buffered lane) |
//! | `system`    | System event handler       | CommandChannel                 |
//! | `log_sink`  | NetworkEventSink           | `log` facade                   |
//! | `sim`       | Transport                  | in-process simulator           |
//! | `posix`     | Transport                  | ioctl device + POSIX mqueue    |

pub mod ethernet;
pub mod log_sink;
#[cfg(all(feature = "posix", target_os = "linux"))]
pub mod posix;
pub mod sim;
pub mod system;
pub mod wifi;

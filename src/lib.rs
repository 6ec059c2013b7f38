// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) wires these modules into the interactive session.
//
// Module responsibilities:
// - `config`: `d2d.config` parsing, the Dropbox token file, and the
//   credential prompt.
// - `nav`: the navigation stack over the portal's course hierarchy,
//   pure state with no browser attached.
// - `portal`: the WebDriver session, the locator set for the portal's
//   markup, the page listers, and the per-entry download trigger.
// - `relay`: polling the download directory for finished files and
//   pushing them to Dropbox.
// - `ui`: the `ls`/`cd`/`d2d`/`h`/`q` command loop that ties the above
//   together.
//
// Keeping the navigation state out of `portal` means the state machine
// can be tested without a browser, and the locator table can change
// without touching anything else.
pub mod config;
pub mod nav;
pub mod portal;
pub mod relay;
pub mod ui;

//! DOM event kinds the runtime can route.

use std::fmt;
use std::str::FromStr;

/// The kind of DOM event an [`EventHandler`](super::Attribute) listens for.
///
/// The wire name (`click`, `input`, ...) is what the browser client uses in
/// the `<event prefix>-<kind>` attribute it watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
	/// Mouse click.
	Click,
	/// Double click.
	DblClick,
	/// Mouse button pressed.
	MouseDown,
	/// Mouse button released.
	MouseUp,
	/// Pointer entered the element.
	MouseEnter,
	/// Pointer left the element.
	MouseLeave,
	/// Input value changed (fires per keystroke).
	Input,
	/// Input value committed.
	Change,
	/// Form submitted.
	Submit,
	/// Element gained focus.
	Focus,
	/// Element lost focus.
	Blur,
	/// Key pressed.
	KeyDown,
	/// Key released.
	KeyUp,
}

impl EventType {
	/// The wire name of this event kind.
	pub fn as_str(&self) -> &'static str {
		match self {
			EventType::Click => "click",
			EventType::DblClick => "dblclick",
			EventType::MouseDown => "mousedown",
			EventType::MouseUp => "mouseup",
			EventType::MouseEnter => "mouseenter",
			EventType::MouseLeave => "mouseleave",
			EventType::Input => "input",
			EventType::Change => "change",
			EventType::Submit => "submit",
			EventType::Focus => "focus",
			EventType::Blur => "blur",
			EventType::KeyDown => "keydown",
			EventType::KeyUp => "keyup",
		}
	}
}

impl fmt::Display for EventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EventType {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"click" => Ok(EventType::Click),
			"dblclick" => Ok(EventType::DblClick),
			"mousedown" => Ok(EventType::MouseDown),
			"mouseup" => Ok(EventType::MouseUp),
			"mouseenter" => Ok(EventType::MouseEnter),
			"mouseleave" => Ok(EventType::MouseLeave),
			"input" => Ok(EventType::Input),
			"change" => Ok(EventType::Change),
			"submit" => Ok(EventType::Submit),
			"focus" => Ok(EventType::Focus),
			"blur" => Ok(EventType::Blur),
			"keydown" => Ok(EventType::KeyDown),
			"keyup" => Ok(EventType::KeyUp),
			_ => Err(()),
		}
	}
}

//! Mouse-position overlay
//!
//! A marker element that follows the pointer, installed into every page
//! before navigation so recorded videos and trace snapshots show where the
//! virtual mouse is during a gesture. The overlay is cosmetic: it ignores
//! pointer events and never participates in the drag itself.

use crate::driver::BrowserBridge;
use crate::error::E2eResult;

/// Install the overlay as an init script on the current page.
pub async fn install(bridge: &BrowserBridge) -> E2eResult<()> {
    bridge.add_init_script(MOUSE_OVERLAY_JS).await
}

// Adapted from https://gist.github.com/aslushnikov/94108a4094532c7752135c42e12a00eb
pub const MOUSE_OVERLAY_JS: &str = r"
(() => {
  // top-level frame only
  if (window !== window.parent) return;
  window.addEventListener('DOMContentLoaded', () => {
    const box = document.createElement('e2e-mouse-pointer');
    const style = document.createElement('style');
    style.innerHTML = `
      e2e-mouse-pointer {
        pointer-events: none;
        position: absolute;
        top: 0;
        z-index: 10000;
        left: 0;
        width: 20px;
        height: 20px;
        background: rgba(0,0,0,.4);
        border: 1px solid white;
        border-radius: 10px;
        margin: -10px 0 0 -10px;
        padding: 0;
        transition: background .2s, border-radius .2s, border-color .2s;
      }
      e2e-mouse-pointer.button-1 {
        transition: none;
        background: rgba(0,0,0,0.9);
      }
      e2e-mouse-pointer.button-2 {
        transition: none;
        border-color: rgba(0,0,255,0.9);
      }
      e2e-mouse-pointer.button-3 {
        transition: none;
        border-radius: 4px;
      }
      e2e-mouse-pointer.button-4 {
        transition: none;
        border-color: rgba(255,0,0,0.9);
      }
      e2e-mouse-pointer.button-5 {
        transition: none;
        border-color: rgba(0,255,0,0.9);
      }
    `;
    document.head.appendChild(style);
    document.body.appendChild(box);
    document.addEventListener('mousemove', (event) => {
      box.style.left = event.pageX + 'px';
      box.style.top = event.pageY + 'px';
    }, true);
    document.addEventListener('mousedown', (event) => {
      box.classList.add('button-' + event.which);
    }, true);
    document.addEventListener('mouseup', (event) => {
      box.classList.remove('button-' + event.which);
    }, true);
  }, false);
})();
";

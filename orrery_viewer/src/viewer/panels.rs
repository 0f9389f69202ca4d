use crate::overlay::TextPanel;

/// A HUD panel plus the NDC quad it draws into. The quad buffer is rewritten
/// by the layout pass whenever the window geometry changes.
pub(super) struct PanelSlot {
    pub(super) panel: TextPanel,
    pub(super) quad_buffer: wgpu::Buffer,
}

/// The three HUD panels. Each is optional so a layout preset can disable it.
pub(super) struct OverlayPanels {
    pub(super) status: Option<PanelSlot>,
    pub(super) holders: Option<PanelSlot>,
    pub(super) focus: Option<PanelSlot>,
}

impl OverlayPanels {
    pub(super) fn iter(&self) -> impl Iterator<Item = &PanelSlot> {
        self.status
            .iter()
            .chain(self.holders.iter())
            .chain(self.focus.iter())
    }

    pub(super) fn iter_mut(&mut self) -> impl Iterator<Item = &mut PanelSlot> {
        self.status
            .iter_mut()
            .chain(self.holders.iter_mut())
            .chain(self.focus.iter_mut())
    }

    pub(super) fn upload_all(&mut self, queue: &wgpu::Queue) {
        for slot in self.iter_mut() {
            slot.panel.upload(queue);
        }
    }
}

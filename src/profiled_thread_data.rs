use crate::buffer_view::BufferView;
use crate::jit_frame_info::{JitAddressResolver, JitFrameInfo};
use crate::markers::MarkerLookup;
use crate::props::StreamingProps;
use crate::thread::ThreadProfile;
use crate::unique_stacks::UniqueStacks;

/// Per-thread state that survives across buffer streams: where the
/// thread's current JS context became available, and the JIT frame
/// information saved from JS contexts that are gone.
///
/// JIT return addresses can only be resolved while the JS context that
/// produced them is alive. When a context goes away, the addresses of the
/// samples it covered are resolved right away and kept here until the
/// buffer no longer contains those samples.
#[derive(Debug)]
pub struct ProfiledThreadData {
    tid: i32,
    buffer_position_when_received_js_context: Option<u64>,
    jit_frame_info_for_previous_js_contexts: Option<JitFrameInfo>,
}

impl ProfiledThreadData {
    pub fn new(tid: i32) -> Self {
        Self {
            tid,
            buffer_position_when_received_js_context: None,
            jit_frame_info_for_previous_js_contexts: None,
        }
    }

    pub fn tid(&self) -> i32 {
        self.tid
    }

    pub fn buffer_position_when_received_js_context(&self) -> Option<u64> {
        self.buffer_position_when_received_js_context
    }

    pub fn jit_frame_info_for_previous_js_contexts(&self) -> Option<&JitFrameInfo> {
        self.jit_frame_info_for_previous_js_contexts.as_ref()
    }

    /// Records that a JS context became available when the buffer's write
    /// position was `current_buffer_position`.
    pub fn notify_received_js_context(&mut self, current_buffer_position: u64) {
        self.buffer_position_when_received_js_context = Some(current_buffer_position);
    }

    /// Resolves the JIT addresses sampled since the JS context was received,
    /// while the context is still alive, and keeps the result.
    ///
    /// Does nothing if no JS context was received.
    pub fn notify_about_to_lose_js_context(
        &mut self,
        view: &BufferView,
        resolver: &mut dyn JitAddressResolver,
    ) {
        let Some(range_start) = self.buffer_position_when_received_js_context.take() else {
            return;
        };

        let mut jit_frame_info = match self.jit_frame_info_for_previous_js_contexts.take() {
            Some(mut info) if !info.has_expired(view.range_start()) => {
                info.discard_expired_ranges(view.range_start());
                info
            }
            _ => JitFrameInfo::new(),
        };

        let tid = self.tid;
        jit_frame_info.add_info_for_range(range_start, view.range_end(), resolver, |consumer| {
            view.for_each_jit_address(range_start, tid, consumer)
        });

        self.jit_frame_info_for_previous_js_contexts = Some(jit_frame_info);
    }

    /// Streams this thread's samples and markers from `view`.
    ///
    /// JIT addresses are resolved with the saved information from previous
    /// JS contexts, plus, if a JS context is live and `resolver` is given,
    /// information for the range since that context was received.
    pub fn stream_json(
        &mut self,
        view: &BufferView,
        resolver: Option<&mut dyn JitAddressResolver>,
        marker_lookup: &dyn MarkerLookup,
        props: &StreamingProps,
    ) -> ThreadProfile {
        if let Some(info) = &mut self.jit_frame_info_for_previous_js_contexts {
            if info.has_expired(view.range_start()) {
                log::info!(
                    "Discarding expired JIT frame info for thread {}, buffer now starts at {}",
                    self.tid,
                    view.range_start()
                );
                self.jit_frame_info_for_previous_js_contexts = None;
            } else {
                // Only the retained info is pruned; the copy below is what
                // the range indices of this stream refer to.
                info.discard_expired_ranges(view.range_start());
            }
        }

        let mut jit_frame_info = match &self.jit_frame_info_for_previous_js_contexts {
            Some(info) => info.deep_copy(),
            None => JitFrameInfo::new(),
        };

        if let (Some(range_start), Some(resolver)) =
            (self.buffer_position_when_received_js_context, resolver)
        {
            let tid = self.tid;
            jit_frame_info.add_info_for_range(
                range_start,
                view.range_end(),
                resolver,
                |consumer| view.for_each_jit_address(range_start, tid, consumer),
            );
        }

        let unique_stacks = UniqueStacks::new(jit_frame_info);
        ThreadProfile::from_buffer(self.tid, view, unique_stacks, marker_lookup, props)
    }
}

/// Declares an opaque, copyable object handle.
macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl From<$name> for Object {
            #[inline]
            fn from(handle: $name) -> Self {
                Object::$name(handle)
            }
        }
    };
}

handle!(
    /// Two-dimensional texture.
    Texture2d
);
handle!(
    /// Sampling view over a resource.
    ShaderResourceView
);
handle!(
    /// Color output view over a texture.
    RenderTargetView
);
handle!(DepthStencilView);
handle!(SamplerState);
handle!(VertexShader);
handle!(PixelShader);
handle!(InputLayout);
handle!(Buffer);

/// Any reference-counted device object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Object {
    Texture2d(Texture2d),
    ShaderResourceView(ShaderResourceView),
    RenderTargetView(RenderTargetView),
    DepthStencilView(DepthStencilView),
    SamplerState(SamplerState),
    VertexShader(VertexShader),
    PixelShader(PixelShader),
    InputLayout(InputLayout),
    Buffer(Buffer),
}

/// A resource that views and copies can address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Texture2d(Texture2d),
    Buffer(Buffer),
}

impl Resource {
    #[inline]
    pub fn as_texture(self) -> Option<Texture2d> {
        match self {
            Resource::Texture2d(t) => Some(t),
            Resource::Buffer(_) => None,
        }
    }
}

impl From<Texture2d> for Resource {
    fn from(texture: Texture2d) -> Self {
        Resource::Texture2d(texture)
    }
}

impl From<Buffer> for Resource {
    fn from(buffer: Buffer) -> Self {
        Resource::Buffer(buffer)
    }
}

impl From<Resource> for Object {
    fn from(resource: Resource) -> Self {
        match resource {
            Resource::Texture2d(t) => Object::Texture2d(t),
            Resource::Buffer(b) => Object::Buffer(b),
        }
    }
}

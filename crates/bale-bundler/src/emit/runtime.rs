//! The module registry every entry chunk starts with.
//!
//! Chunks register factories by pushing onto the `__bale_defs__` queue, so a
//! chunk may load before or after the runtime. The first runtime to run
//! drains the queue and replaces its `push`.

const RUNTIME: &str = r#"(function (global) {
  if (global.__bale__) return;
  var hot = __BALE_HOT__;
  var factories = {};
  var cache = {};
  var files = {};
  var bale = {};

  function define(map) {
    for (var key in map) factories[key] = map[key];
  }

  function makeHot() {
    var state = { self: false, accepts: [], disposers: [] };
    return {
      _state: state,
      accept: function (deps, callback) {
        if (deps === undefined || typeof deps === "function") {
          state.self = true;
          return;
        }
        state.accepts.push({ deps: [].concat(deps), callback: callback });
      },
      dispose: function (fn) {
        state.disposers.push(fn);
      }
    };
  }

  function require(key) {
    var cached = cache[key];
    if (cached) return cached.exports;
    var factory = factories[key];
    if (!factory) throw new Error("bale: module '" + key + "' is not loaded");
    var module = { id: key, exports: {}, hot: hot ? makeHot() : undefined };
    cache[key] = module;
    factory.call(module.exports, module, module.exports, require);
    return module.exports;
  }

  function loadFile(url) {
    if (files[url]) return files[url];
    files[url] = new Promise(function (resolve, reject) {
      var css = /\.css(\?|$)/.test(url);
      var el = document.createElement(css ? "link" : "script");
      if (css) {
        el.rel = "stylesheet";
        el.href = url;
      } else {
        el.src = url;
      }
      el.onload = function () { resolve(); };
      el.onerror = function () {
        delete files[url];
        reject(new Error("bale: failed to load " + url));
      };
      document.head.appendChild(el);
    });
    return files[url];
  }

  bale.require = require;
  bale.loadFile = loadFile;

  bale.esm = function (exports, getters) {
    Object.defineProperty(exports, "__esModule", { value: true, configurable: true });
    for (var name in getters) {
      Object.defineProperty(exports, name, { enumerable: true, configurable: true, get: getters[name] });
    }
  };

  bale.interop = function (exports) {
    if (exports && exports.__esModule) return exports;
    var ns = { default: exports };
    if (exports && typeof exports === "object") {
      for (var key in exports) if (key !== "default") ns[key] = exports[key];
    }
    return ns;
  };

  bale.reexport = function (exports, source) {
    var ns = bale.interop(source);
    var getters = {};
    Object.keys(ns).forEach(function (key) {
      if (key !== "default" && !(key in exports)) getters[key] = function () { return ns[key]; };
    });
    bale.esm(exports, getters);
  };

  bale.external = function (name) {
    var table = global.__bale_externals__;
    if (table && name in table) return table[name];
    if (name in global) return global[name];
    throw new Error("bale: external '" + name + "' is not available");
  };

  bale.missing = function (specifier) {
    throw new Error("bale: cannot find module '" + specifier + "'");
  };

  bale.load = function (urls, key) {
    return Promise.all(urls.map(loadFile)).then(function () {
      return bale.interop(require(key));
    });
  };

  bale.run = function (urls, key) {
    var pending = urls.filter(function (url) { return !files[url]; });
    if (pending.length === 0) return require(key);
    return Promise.all(pending.map(loadFile)).then(function () { return require(key); });
  };

  bale.update = function (map) {
    var updated = Object.keys(map);
    var reload = [];
    var handled = {};
    updated.forEach(function (key) {
      var old = cache[key];
      if (!old) {
        handled[key] = true;
      } else if (old.hot) {
        old.hot._state.disposers.forEach(function (fn) { fn(); });
        if (old.hot._state.self) reload.push(key);
      }
      delete cache[key];
      factories[key] = map[key];
    });
    reload.forEach(function (key) {
      require(key);
      handled[key] = true;
    });
    Object.keys(cache).forEach(function (owner) {
      var module = cache[owner];
      if (!module.hot) return;
      module.hot._state.accepts.forEach(function (entry) {
        var hit = entry.deps.filter(function (dep) { return updated.indexOf(dep) !== -1; });
        if (hit.length === 0) return;
        hit.forEach(function (dep) {
          require(dep);
          handled[dep] = true;
        });
        if (entry.callback) entry.callback(hit);
      });
    });
    if (updated.some(function (key) { return !handled[key]; })) global.location.reload();
  };

  if (typeof document !== "undefined") {
    Array.prototype.forEach.call(document.querySelectorAll("script[src]"), function (el) {
      files[el.getAttribute("src")] = Promise.resolve();
    });
    Array.prototype.forEach.call(document.querySelectorAll("link[rel=stylesheet]"), function (el) {
      files[el.getAttribute("href")] = Promise.resolve();
    });
  }

  var queue = global.__bale_defs__ || [];
  queue.forEach(define);
  queue.push = function (map) { define(map); };
  global.__bale_defs__ = queue;
  global.__bale__ = bale;
})(typeof globalThis !== "undefined" ? globalThis : self);
"#;

/// Opening of every chunk's factory table.
pub const DEFINE_OPEN: &str =
    "(globalThis.__bale_defs__ = globalThis.__bale_defs__ || []).push({\n";

pub const DEFINE_CLOSE: &str = "});\n";

/// Runtime source with hot replacement switched on or off.
pub fn runtime(hot: bool) -> String {
    RUNTIME.replace("__BALE_HOT__", if hot { "true" } else { "false" })
}
